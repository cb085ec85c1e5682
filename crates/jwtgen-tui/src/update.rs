//! TUI reducer (update function).
//!
//! All state transitions happen here. The runtime calls `update(app, event)`
//! and executes the returned effects.
//!
//! The one write that happens inline is the API key cache: every edit of the
//! key field goes through `CredentialController::set_field`, which persists
//! it synchronously.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use jwtgen_core::controller::{AuthOp, Field, Phase};
use jwtgen_core::provider::AuthProvider;
use jwtgen_core::store::SettingsStore;

use crate::clipboard::CopyMethod;
use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::render;
use crate::state::{AppState, Flash, Focus};

type Effects<P> = Vec<UiEffect<<P as AuthProvider>::Client>>;

/// The main reducer function.
pub fn update<P, S>(app: &mut AppState<P, S>, event: UiEvent) -> Effects<P>
where
    P: AuthProvider,
    S: SettingsStore,
{
    match event {
        UiEvent::Tick => {
            app.spinner_frame = app.spinner_frame.wrapping_add(1);
            if app.flash.as_ref().is_some_and(Flash::is_expired) {
                app.flash = None;
            }
            vec![]
        }
        UiEvent::Frame { width, height } => {
            app.viewport = (width, height);
            vec![]
        }
        UiEvent::Terminal(term_event) => handle_terminal_event(app, term_event),
        UiEvent::AuthFinished { outcome } => {
            app.controller.complete(outcome);
            app.token_scroll = 0;
            vec![]
        }
        UiEvent::ClipboardCopied { method } => {
            let text = match method {
                CopyMethod::System => "Token copied to clipboard",
                CopyMethod::Terminal => "Token sent to terminal clipboard (OSC 52)",
            };
            app.flash = Some(Flash::info(text));
            vec![]
        }
        UiEvent::ClipboardFailed { error } => {
            tracing::warn!(%error, "clipboard copy failed");
            app.flash = Some(Flash::error(format!("Could not copy token: {error}")));
            vec![]
        }
    }
}

fn handle_terminal_event<P, S>(app: &mut AppState<P, S>, event: Event) -> Effects<P>
where
    P: AuthProvider,
    S: SettingsStore,
{
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
        Event::Paste(text) => {
            handle_paste(app, &text);
            vec![]
        }
        _ => vec![],
    }
}

fn handle_key<P, S>(app: &mut AppState<P, S>, key: KeyEvent) -> Effects<P>
where
    P: AuthProvider,
    S: SettingsStore,
{
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl && key.code == KeyCode::Char('c') {
        return vec![UiEffect::Quit];
    }

    if app.phase() == Phase::Authenticated {
        handle_token_view_key(app, key)
    } else {
        handle_form_key(app, key)
    }
}

fn handle_token_view_key<P, S>(app: &mut AppState<P, S>, key: KeyEvent) -> Effects<P>
where
    P: AuthProvider,
    S: SettingsStore,
{
    match key.code {
        KeyCode::Char('q') => vec![UiEffect::Quit],
        KeyCode::Char('r') => {
            app.controller.reset();
            app.flash = None;
            app.token_scroll = 0;
            app.focus = Focus::Login;
            vec![]
        }
        KeyCode::Char('c') => app
            .token()
            .map(|token| UiEffect::CopyToClipboard {
                text: token.to_string(),
            })
            .into_iter()
            .collect(),
        KeyCode::Esc => {
            app.controller.dismiss_notice();
            vec![]
        }
        KeyCode::Up
        | KeyCode::Down
        | KeyCode::Char('j' | 'k')
        | KeyCode::PageUp
        | KeyCode::PageDown
        | KeyCode::Home
        | KeyCode::End => {
            scroll_token(app, key.code);
            vec![]
        }
        _ => vec![],
    }
}

/// Moves the token view, keeping the offset within the current viewport.
fn scroll_token<P, S>(app: &mut AppState<P, S>, code: KeyCode)
where
    P: AuthProvider,
    S: SettingsStore,
{
    let (max, page) = render::token_scroll_bounds(app);
    let page = page.max(1);
    let current = app.token_scroll.min(max);

    let next = match code {
        KeyCode::Down | KeyCode::Char('j') => current.saturating_add(1),
        KeyCode::Up | KeyCode::Char('k') => current.saturating_sub(1),
        KeyCode::PageDown => current.saturating_add(page),
        KeyCode::PageUp => current.saturating_sub(page),
        KeyCode::Home => 0,
        KeyCode::End => max,
        _ => current,
    };
    app.token_scroll = next.min(max);
}

fn handle_form_key<P, S>(app: &mut AppState<P, S>, key: KeyEvent) -> Effects<P>
where
    P: AuthProvider,
    S: SettingsStore,
{
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('l') if ctrl => return submit(app, AuthOp::SignIn),
        KeyCode::Char('n') if ctrl => return submit(app, AuthOp::SignUp),
        KeyCode::Char('r') if ctrl => {
            app.reveal_password = !app.reveal_password;
            return vec![];
        }
        KeyCode::Esc => {
            app.controller.dismiss_notice();
            return vec![];
        }
        KeyCode::Tab | KeyCode::Down => {
            app.focus = app.focus.next();
            return vec![];
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.focus = app.focus.prev();
            return vec![];
        }
        _ => {}
    }

    match app.focus {
        Focus::Login if key.code == KeyCode::Enter => submit(app, AuthOp::SignIn),
        Focus::SignUp if key.code == KeyCode::Enter => submit(app, AuthOp::SignUp),
        Focus::Input(_) if key.code == KeyCode::Enter => {
            app.focus = app.focus.next();
            vec![]
        }
        Focus::Input(field) => {
            if app.editors.get_mut(field).handle_key(key) {
                sync_field(app, field);
            }
            vec![]
        }
        Focus::Login | Focus::SignUp => vec![],
    }
}

fn handle_paste<P, S>(app: &mut AppState<P, S>, text: &str)
where
    P: AuthProvider,
    S: SettingsStore,
{
    if app.phase() == Phase::Authenticated {
        return;
    }
    if let Focus::Input(field) = app.focus {
        app.editors.get_mut(field).insert_str(text);
        sync_field(app, field);
    }
}

/// Pushes an editor's text into the controller.
fn sync_field<P, S>(app: &mut AppState<P, S>, field: Field)
where
    P: AuthProvider,
    S: SettingsStore,
{
    let value = app.editors.get(field).text().to_string();
    app.controller.set_field(field, value);
}

fn submit<P, S>(app: &mut AppState<P, S>, op: AuthOp) -> Effects<P>
where
    P: AuthProvider,
    S: SettingsStore,
{
    app.controller
        .begin(op)
        .map(|request| UiEffect::Authenticate { request })
        .into_iter()
        .collect()
}
