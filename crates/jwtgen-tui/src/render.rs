//! Pure view/render functions for the TUI.
//!
//! Functions here take `&AppState`, draw to a ratatui `Frame`, and never
//! mutate state or return effects.

use chrono::{DateTime, Utc};
use jwtgen_core::controller::{BusyState, Field, Phase, ResultNotice, USER_CREATED_TITLE};
use jwtgen_core::provider::AuthProvider;
use jwtgen_core::store::SettingsStore;
use jwtgen_core::token::TokenSummary;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::render_utils::{InputHint, render_hints, titled_block, wrapped_height};
use crate::state::{AppState, Focus};

const TITLE: &str = "JWT Generator for Firebase";
const TAGLINE: &str = "\u{201c}because sometimes you just want a JWT token\u{201d}";

const DISCLAIMER: &str = "Runs entirely on your machine. Credentials go straight to the \
identity provider; passwords and tokens are never recorded. Only the Web API key is \
cached locally.";

const INSTRUCTIONS: [&str; 2] = [
    "1. Enter your Firebase project Web API Key.",
    "2. Create an account and login.",
];

const API_KEY_HINT: &str = "get from Project Settings > General";

/// Spinner frames for the busy indicator.
const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];

const ACCENT: Color = Color::Rgb(255, 145, 0);

/// Horizontal padding on each side of the page.
const MARGIN: u16 = 2;

/// Renders the entire TUI to the frame.
pub fn render<P, S>(app: &AppState<P, S>, frame: &mut Frame)
where
    P: AuthProvider,
    S: SettingsStore,
{
    let page = page_layout(app, frame.area());

    render_header(frame, page.header);
    if page.intro.height > 0 {
        render_intro(frame, page.intro);
    }
    render_status(app, frame, page.status);
    if let Some(notice) = app.controller.notice() {
        render_notice(frame, page.notice, notice);
    }

    match app.phase() {
        Phase::Authenticated => render_token_view(app, frame, page.body),
        Phase::Unconfigured | Phase::Ready | Phase::Busy => render_form(app, frame, page.body),
    }

    let scrollable = token_scroll_bounds_in(app, frame.area()).0 > 0;
    render_footer(app, frame, page.footer, scrollable);
}

/// Largest useful `token_scroll` and the rows shown per page, for the
/// viewport last reported by a `Frame` event.
pub fn token_scroll_bounds<P, S>(app: &AppState<P, S>) -> (usize, usize)
where
    P: AuthProvider,
    S: SettingsStore,
{
    let (width, height) = app.viewport;
    token_scroll_bounds_in(app, Rect::new(0, 0, width, height))
}

fn token_scroll_bounds_in<P, S>(app: &AppState<P, S>, full: Rect) -> (usize, usize)
where
    P: AuthProvider,
    S: SettingsStore,
{
    let Some(token) = app.token() else {
        return (0, 0);
    };
    let body = page_layout(app, full).body;
    let pane = TokenPane::new(token, detail_lines(app).len(), token_block().inner(body));
    (pane.max_scroll(), pane.visible)
}

struct PageLayout {
    header: Rect,
    intro: Rect,
    status: Rect,
    notice: Rect,
    body: Rect,
    footer: Rect,
}

fn page_layout<P, S>(app: &AppState<P, S>, full: Rect) -> PageLayout
where
    P: AuthProvider,
    S: SettingsStore,
{
    let area = Rect::new(
        full.x + MARGIN.min(full.width / 2),
        full.y,
        full.width.saturating_sub(MARGIN * 2),
        full.height,
    );

    // The token view needs every row it can get.
    let intro_height = if app.phase() == Phase::Authenticated {
        0
    } else {
        wrapped_height(DISCLAIMER, area.width.saturating_sub(2)) + INSTRUCTIONS.len() as u16 + 3
    };
    let notice_height = app.controller.notice().map_or(0, |n| {
        wrapped_height(&n.message, area.width.saturating_sub(2)) + 2
    });

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(intro_height),
            Constraint::Length(1),
            Constraint::Length(notice_height),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    PageLayout {
        header: chunks[0],
        intro: chunks[1],
        status: chunks[2],
        notice: chunks[3],
        body: chunks[4],
        footer: chunks[5],
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            TITLE,
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            TAGLINE,
            Style::default().fg(ACCENT).add_modifier(Modifier::ITALIC),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_intro(frame: &mut Frame, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(DISCLAIMER, Style::default().fg(Color::Gray))),
        Line::from(""),
        Line::from(Span::styled(
            "INSTRUCTIONS",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    lines.extend(INSTRUCTIONS.iter().map(|step| Line::from(*step)));

    let para = Paragraph::new(lines)
        .block(titled_block("⚠", ACCENT))
        .wrap(Wrap { trim: true });
    frame.render_widget(para, area);
}

/// Busy spinner, or the transient feedback line when idle.
fn render_status<P, S>(app: &AppState<P, S>, frame: &mut Frame, area: Rect)
where
    P: AuthProvider,
    S: SettingsStore,
{
    let line = match app.controller.busy() {
        BusyState::Idle => match &app.flash {
            Some(flash) => {
                let color = if flash.is_error { Color::Red } else { Color::Green };
                Line::from(Span::styled(flash.text.clone(), Style::default().fg(color)))
            }
            None => Line::from(""),
        },
        busy => {
            let spinner = SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()];
            let label = if busy == BusyState::SigningUp {
                "Creating account..."
            } else {
                "Logging in..."
            };
            Line::from(vec![
                Span::styled(format!("{spinner} "), Style::default().fg(ACCENT)),
                Span::styled(label, Style::default().fg(Color::Yellow)),
            ])
        }
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_notice(frame: &mut Frame, area: Rect, notice: &ResultNotice) {
    let color = if notice.title == USER_CREATED_TITLE {
        Color::Green
    } else {
        Color::Red
    };
    let para = Paragraph::new(notice.message.clone())
        .block(titled_block(&notice.title, color))
        .wrap(Wrap { trim: false });
    frame.render_widget(para, area);
}

fn render_form<P, S>(app: &AppState<P, S>, frame: &mut Frame, area: Rect)
where
    P: AuthProvider,
    S: SettingsStore,
{
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    for (field, row) in Field::ALL.into_iter().zip(rows.iter()) {
        render_field(app, frame, *row, field);
    }
    render_buttons(app, frame, rows[4]);
}

fn render_field<P, S>(app: &AppState<P, S>, frame: &mut Frame, area: Rect, field: Field)
where
    P: AuthProvider,
    S: SettingsStore,
{
    if area.height < 3 {
        return;
    }

    let focused = app.focus == Focus::Input(field);
    let border = if focused { ACCENT } else { Color::DarkGray };
    let mut title = vec![Span::styled(
        format!(" {} ", field.label()),
        Style::default().fg(border).add_modifier(Modifier::BOLD),
    )];
    if field == Field::ApiKey {
        title.push(Span::styled(
            format!("{API_KEY_HINT} "),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if field == Field::Password && !app.reveal_password {
        title.push(Span::styled(
            "hidden ",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(Line::from(title));
    let inner = block.inner(area);

    let masked = field == Field::Password && !app.reveal_password;
    let editor = app.editors.get(field);
    let (visible, cursor_col) = editor.viewport(inner.width, masked);

    frame.render_widget(Paragraph::new(visible).block(block), area);

    if focused && app.phase() != Phase::Authenticated {
        frame.set_cursor_position((inner.x + cursor_col, inner.y));
    }
}

fn render_buttons<P, S>(app: &AppState<P, S>, frame: &mut Frame, area: Rect)
where
    P: AuthProvider,
    S: SettingsStore,
{
    let disabled = !app.controller.busy().is_idle();
    let button = |label: &'static str, focus: Focus| {
        let style = if disabled {
            Style::default().fg(Color::DarkGray)
        } else if app.focus == focus {
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        };
        Span::styled(format!("[ {label} ]"), style)
    };

    let line = Line::from(vec![
        button("Login", Focus::Login),
        Span::raw("  "),
        button("Sign up", Focus::SignUp),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// The token cut into rows of the pane width, and how many rows fit.
///
/// ID tokens are one unbroken ASCII run, so they are split by column rather
/// than word-wrapped.
struct TokenPane {
    rows: Vec<String>,
    visible: usize,
    show_claims: bool,
}

impl TokenPane {
    fn new(token: &str, claims: usize, inner: Rect) -> Self {
        let width = usize::from(inner.width.max(1));
        let chars: Vec<char> = token.chars().collect();
        let rows: Vec<String> = chars
            .chunks(width)
            .map(|chunk| chunk.iter().collect())
            .collect();

        // heading above, refresh link below
        let available = usize::from(inner.height.saturating_sub(2)).max(1);
        let show_claims = claims > 0 && available >= rows.len() + claims + 1;
        let visible = rows.len().min(available);

        Self {
            rows,
            visible,
            show_claims,
        }
    }

    fn max_scroll(&self) -> usize {
        self.rows.len().saturating_sub(self.visible)
    }
}

fn token_block() -> Block<'static> {
    titled_block("Token", Color::Green)
}

fn render_token_view<P, S>(app: &AppState<P, S>, frame: &mut Frame, area: Rect)
where
    P: AuthProvider,
    S: SettingsStore,
{
    let Some(token) = app.token() else {
        return;
    };

    let claims = detail_lines(app);
    let block = token_block();
    let pane = TokenPane::new(token, claims.len(), block.inner(area));
    let offset = app.token_scroll.min(pane.max_scroll());

    let mut heading = vec![Span::styled(
        "Your JWT token is:",
        Style::default().fg(Color::Gray),
    )];
    if pane.max_scroll() > 0 {
        heading.push(Span::styled(
            format!(
                "  rows {}-{} of {}",
                offset + 1,
                offset + pane.visible,
                pane.rows.len()
            ),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let mut lines = vec![Line::from(heading)];
    lines.extend(
        pane.rows
            .iter()
            .skip(offset)
            .take(pane.visible)
            .map(|row| Line::from(Span::styled(row.clone(), Style::default().fg(Color::White)))),
    );

    if pane.show_claims {
        lines.push(Line::from(""));
        lines.extend(claims);
    }

    lines.push(Line::from(vec![
        Span::styled("↻ ", Style::default().fg(ACCENT)),
        Span::styled(
            "Refresh and sign-in again",
            Style::default().fg(ACCENT).add_modifier(Modifier::UNDERLINED),
        ),
        Span::styled(" (r)", Style::default().fg(Color::DarkGray)),
    ]));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Decoded claims plus the lifetime the provider reported at issue time.
fn detail_lines<P, S>(app: &AppState<P, S>) -> Vec<Line<'static>>
where
    P: AuthProvider,
    S: SettingsStore,
{
    let Some(auth) = app.controller.auth() else {
        return Vec::new();
    };
    let mut lines = TokenSummary::decode(&auth.token)
        .map(|summary| claim_lines(&summary))
        .unwrap_or_default();
    if let Some(secs) = auth.session.expires_in() {
        lines.push(Line::from(vec![
            claim_label("Lifetime"),
            Span::raw(format_lifetime(secs)),
        ]));
    }
    lines
}

fn format_lifetime(secs: u64) -> String {
    if secs >= 60 && secs % 60 == 0 {
        format!("{} min", secs / 60)
    } else {
        format!("{secs} s")
    }
}

fn claim_label(name: &str) -> Span<'static> {
    Span::styled(format!("{name:<10}"), Style::default().fg(Color::DarkGray))
}

fn claim_lines(summary: &TokenSummary) -> Vec<Line<'static>> {
    let label = claim_label;
    let fmt_time = |t: DateTime<Utc>| t.format("%Y-%m-%d %H:%M:%S UTC").to_string();

    let mut lines = Vec::new();
    let mut push = |name: &str, value: Option<String>| {
        if let Some(value) = value {
            lines.push(Line::from(vec![label(name), Span::raw(value)]));
        }
    };

    push("User ID", summary.sub.clone());
    push("E-mail", summary.email.clone());
    push("Audience", summary.aud.clone());
    push("Issuer", summary.iss.clone());
    push("Issued", summary.issued_at().map(fmt_time));
    push(
        "Expires",
        summary.expires_at().map(|exp| {
            if summary.is_expired_at(Utc::now()) {
                format!("{} (expired)", fmt_time(exp))
            } else {
                fmt_time(exp)
            }
        }),
    );

    lines
}

fn render_footer<P, S>(app: &AppState<P, S>, frame: &mut Frame, area: Rect, scrollable: bool)
where
    P: AuthProvider,
    S: SettingsStore,
{
    let hints = if app.phase() == Phase::Authenticated {
        let mut hints = vec![
            InputHint::new("c", "copy"),
            InputHint::new("r", "sign in again"),
            InputHint::new("q", "quit"),
        ];
        if scrollable {
            hints.insert(0, InputHint::new("↑↓/PgUp/PgDn", "scroll"));
        }
        hints
    } else {
        vec![
            InputHint::new("Tab", "next"),
            InputHint::new("Ctrl+L", "login"),
            InputHint::new("Ctrl+N", "sign up"),
            InputHint::new("Ctrl+R", "show password"),
            InputHint::new("Esc", "dismiss"),
            InputHint::new("Ctrl+C", "quit"),
        ]
    };
    render_hints(frame, area, &hints, ACCENT);
}

#[cfg(test)]
mod tests {
    use jwtgen_core::controller::{AuthOp, AuthOutcome, AuthResult, CredentialController};
    use jwtgen_core::provider::{IdentityToolkit, Session};
    use jwtgen_core::store::MemoryStore;
    use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::events::UiEvent;
    use crate::update::update;

    fn draw(app: &AppState<IdentityToolkit, MemoryStore>) -> String {
        draw_sized(app, 100, 40)
    }

    fn draw_sized(app: &AppState<IdentityToolkit, MemoryStore>, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn app() -> AppState<IdentityToolkit, MemoryStore> {
        let provider = IdentityToolkit::new("http://127.0.0.1:9");
        AppState::new(CredentialController::new(provider, MemoryStore::new()))
    }

    #[test]
    fn test_form_screen() {
        let mut app = app();
        app.controller.set_field(Field::Password, "secret");
        app.editors.password = crate::input::FieldEditor::with_text("secret");

        let screen = draw(&app);

        assert!(screen.contains("JWT Generator for Firebase"));
        assert!(screen.contains("Web API Key"));
        assert!(screen.contains("[ Login ]"));
        assert!(screen.contains("[ Sign up ]"));
        assert!(!screen.contains("secret"));
    }

    #[test]
    fn test_token_screen() {
        let mut app = app();
        update(
            &mut app,
            UiEvent::AuthFinished {
                outcome: AuthOutcome {
                    op: AuthOp::SignUp,
                    email: "a@b.com".to_string(),
                    result: Ok(AuthResult {
                        session: Session::new("uid-42", None, "opaque-token"),
                        token: "opaque-token".to_string(),
                    }),
                },
            },
        );

        let screen = draw(&app);

        assert!(screen.contains("Your JWT token is:"));
        assert!(screen.contains("opaque-token"));
        assert!(screen.contains("Refresh and sign-in again"));
        assert!(screen.contains("User created"));
    }

    fn press(app: &mut AppState<IdentityToolkit, MemoryStore>, code: KeyCode) {
        update(
            app,
            UiEvent::Terminal(Event::Key(KeyEvent::new(code, KeyModifiers::NONE))),
        );
    }

    #[test]
    fn test_full_length_token_fits_standard_terminal() {
        let token = format!("{}ENDMARK", "x".repeat(936));
        let mut app = app();
        update(
            &mut app,
            UiEvent::Frame {
                width: 80,
                height: 24,
            },
        );
        update(
            &mut app,
            UiEvent::AuthFinished {
                outcome: AuthOutcome {
                    op: AuthOp::SignUp,
                    email: "a@b.com".to_string(),
                    result: Ok(AuthResult {
                        session: Session::new("uid-42", Some("a@b.com".to_string()), &token),
                        token: token.clone(),
                    }),
                },
            },
        );

        // The sign-up notice leaves one row short; the tail is a scroll away.
        let screen = draw_sized(&app, 80, 24);
        assert!(screen.contains("Your JWT token is:"));
        assert!(screen.contains("Refresh and sign-in again"));
        assert!(screen.contains("scroll"));
        assert!(!screen.contains("ENDMARK"));

        press(&mut app, KeyCode::End);
        let screen = draw_sized(&app, 80, 24);
        assert!(screen.contains("ENDMARK"));
        assert!(screen.contains("Refresh and sign-in again"));

        // Without the notice the whole token is on screen at once.
        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Home);
        let screen = draw_sized(&app, 80, 24);
        assert!(screen.contains("ENDMARK"));
        assert!(screen.matches('x').count() >= 936);
        assert!(!screen.contains("rows "));
    }

    #[test]
    fn test_format_lifetime() {
        assert_eq!(format_lifetime(3600), "60 min");
        assert_eq!(format_lifetime(90), "90 s");
        assert_eq!(format_lifetime(0), "0 s");
    }
}
