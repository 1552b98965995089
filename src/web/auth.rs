use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use cookie::time::Duration as CookieDuration;
use serde::Deserialize;
use tracing::warn;

use crate::{
    session::{
        AuthError, AuthSession, CredentialError, CredentialForm, FormMode, Role, SESSION_TTL_DAYS,
        SignUpOutcome, SubmitOutcome,
    },
    toast::Toast,
    web::{
        AppState, escape_html, gate,
        templates::{TOAST_SCRIPT, compose_flash, render_role_selector, render_toast_region},
    },
};

pub const SESSION_COOKIE: &str = "auth_token";

#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub mode: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthFormInput {
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: String,
}

impl AuthFormInput {
    fn into_form(self) -> CredentialForm {
        CredentialForm {
            mode: FormMode::parse(self.mode.trim()).unwrap_or(FormMode::SignIn),
            email: self.email,
            password: self.password,
            full_name: self.full_name,
            role: Role::parse(&self.role).unwrap_or(Role::User),
        }
    }
}

/// What the form shows besides the static text. The password is never echoed back.
struct AuthView<'a> {
    mode: FormMode,
    role: Role,
    email: &'a str,
    full_name: &'a str,
    toast: Option<Toast>,
}

pub async fn auth_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<AuthQuery>,
) -> Result<Html<String>, Redirect> {
    if let Some(redirect) = redirect_if_authenticated(&state, &jar).await {
        return Err(redirect);
    }

    let view = AuthView {
        mode: params
            .mode
            .as_deref()
            .and_then(FormMode::parse)
            .unwrap_or(FormMode::SignIn),
        role: params
            .role
            .as_deref()
            .and_then(Role::parse)
            .unwrap_or(Role::User),
        email: "",
        full_name: "",
        toast: compose_flash(params.status.as_deref(), params.error.as_deref()),
    };

    Ok(Html(render_auth_page(&view)))
}

pub async fn process_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(input): Form<AuthFormInput>,
) -> Response {
    let form = input.into_form();
    let session = gate::session_context(&state, &jar).await;

    match form.submit(&session).await {
        Ok(SubmitOutcome::SignedIn(signed_in)) => {
            let jar = jar.add(session_cookie(&signed_in));
            (jar, Redirect::to("/?status=signed_in")).into_response()
        }
        Ok(SubmitOutcome::SignedUp(outcome)) => {
            let description = match outcome {
                SignUpOutcome::ConfirmationPending => {
                    "Please check your email to confirm your account"
                }
                SignUpOutcome::Active => "Your account is ready, please sign in",
            };
            let view = AuthView {
                mode: FormMode::SignIn,
                role: form.role,
                email: form.email.trim(),
                full_name: "",
                toast: Some(Toast::info("Sign Up Successful", description)),
            };
            Html(render_auth_page(&view)).into_response()
        }
        Err(err) => {
            warn!(mode = form.mode.as_str(), %err, "credential submission rejected");
            let status = failure_status(&err, form.mode);
            let view = AuthView {
                mode: form.mode,
                role: form.role,
                email: form.email.trim(),
                full_name: form.full_name.as_deref().unwrap_or("").trim(),
                toast: Some(Toast::error(err.toast_title(form.mode), err.user_message())),
            };
            (status, Html(render_auth_page(&view))).into_response()
        }
    }
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let ctx = gate::session_context(&state, &jar).await;
    if let Err(err) = ctx.sign_out().await {
        warn!(%err, "failed to end session at the auth service");
    }

    let jar = jar.remove(removal_cookie());
    (jar, Redirect::to("/auth?status=signed_out"))
}

pub async fn redirect_if_authenticated(state: &AppState, jar: &CookieJar) -> Option<Redirect> {
    let ctx = gate::session_context(state, jar).await;
    ctx.current_user().map(|_| Redirect::to("/"))
}

fn failure_status(err: &CredentialError, mode: FormMode) -> StatusCode {
    match err {
        CredentialError::Service(AuthError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        CredentialError::Service(AuthError::Rejected(_)) if mode == FormMode::SignIn => {
            StatusCode::UNAUTHORIZED
        }
        _ => StatusCode::BAD_REQUEST,
    }
}

fn session_cookie(session: &AuthSession) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, session.token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(cookie_lifetime(session.expires_at, Utc::now()));
    cookie
}

/// Time left on the backend session, never more than the local session TTL.
fn cookie_lifetime(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> CookieDuration {
    let remaining = (expires_at - now)
        .num_seconds()
        .clamp(0, SESSION_TTL_DAYS * 24 * 60 * 60);
    CookieDuration::seconds(remaining)
}

fn removal_cookie() -> Cookie<'static> {
    let mut removal = Cookie::new(SESSION_COOKIE, "");
    removal.set_path("/");
    removal.set_http_only(true);
    removal.set_same_site(SameSite::Lax);
    removal.set_max_age(CookieDuration::seconds(0));
    removal
}

const AUTH_PAGE_STYLES: &str = r#"
        :root { color-scheme: light; }
        body { font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; min-height: 100vh; display: flex; align-items: center; justify-content: center; background: linear-gradient(135deg, #f8fafc, #eff6ff); color: #0f172a; padding: 1.5rem; box-sizing: border-box; }
        main { width: 100%; max-width: 460px; }
        .brand { text-align: center; margin-bottom: 1.75rem; }
        .brand h1 { margin: 0 0 0.4rem; font-size: 1.7rem; }
        .brand p { margin: 0; color: #64748b; }
        .panel { background: #ffffff; padding: 2rem; border-radius: 18px; box-shadow: 0 20px 60px rgba(15, 23, 42, 0.08); border: 1px solid #e2e8f0; }
        .role-selector { border: none; margin: 0 0 1.25rem; padding: 0; }
        .role-selector legend { font-weight: 600; margin-bottom: 0.75rem; }
        .role-grid { display: grid; grid-template-columns: 1fr 1fr; gap: 0.75rem; }
        .role-option { display: flex; flex-direction: column; gap: 0.2rem; padding: 0.75rem; border: 1px solid #cbd5e1; border-radius: 10px; cursor: pointer; text-align: center; font-size: 0.85rem; }
        .role-option input { display: none; }
        .role-option:has(input:checked) { background: #2563eb; border-color: #2563eb; color: #ffffff; }
        .role-title { font-weight: 600; }
        .role-desc { opacity: 0.75; font-size: 0.75rem; }
        label.field-label { display: block; margin: 1.1rem 0 0.45rem; font-weight: 600; }
        input[type="text"], input[type="email"], input[type="password"] { width: 100%; padding: 0.8rem; border-radius: 10px; border: 1px solid #cbd5e1; background: #f8fafc; font-size: 1rem; box-sizing: border-box; }
        input:focus { outline: none; border-color: #2563eb; box-shadow: 0 0 0 3px rgba(37, 99, 235, 0.15); }
        .notice { margin-top: 1rem; padding: 0.75rem; border-radius: 8px; background: #f1f5f9; font-size: 0.85rem; color: #475569; }
        .notice strong { display: block; color: #0f172a; }
        .notice[hidden] { display: none; }
        button[type="submit"] { margin-top: 1.75rem; width: 100%; padding: 0.9rem; border: none; border-radius: 10px; background: #2563eb; color: #ffffff; font-weight: 600; font-size: 1rem; cursor: pointer; }
        button[type="submit"]:hover { background: #1d4ed8; }
        .switch { margin-top: 1.25rem; text-align: center; }
        .switch a { color: #2563eb; text-decoration: none; font-weight: 600; }
        .aside { margin-top: 1.5rem; text-align: center; font-size: 0.85rem; color: #64748b; }
        .aside p { margin: 0.2rem 0; }
        .demo { margin-top: 1rem; padding: 1rem; border-radius: 10px; background: rgba(148, 163, 184, 0.15); text-align: left; font-size: 0.8rem; }
        .toast-region { position: fixed; right: 1.25rem; bottom: 1.25rem; display: flex; flex-direction: column; gap: 0.75rem; max-width: 360px; }
        .toast { background: #ffffff; border: 1px solid #e2e8f0; border-radius: 12px; padding: 0.9rem 1.1rem; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.15); }
        .toast strong { display: block; margin-bottom: 0.2rem; }
        .toast p { margin: 0; font-size: 0.9rem; color: #475569; }
        .toast.destructive { background: #b91c1c; border-color: #b91c1c; color: #ffffff; }
        .toast.destructive p { color: #fee2e2; }
"#;

const ROLE_FIELD_SCRIPT: &str = r#"<script>
(function() {
    const form = document.querySelector('form[data-auth-form]');
    if (!form) {
        return;
    }
    const signUp = form.dataset.mode === 'signup';
    const nameLabel = form.querySelector('[data-name-label-target]');
    const nameInput = form.querySelector('input[name="full_name"]');
    const notice = form.querySelector('[data-institution-notice]');
    form.querySelectorAll('input[name="role"]').forEach(radio => {
        radio.addEventListener('change', () => {
            if (nameLabel) {
                nameLabel.textContent = radio.dataset.nameLabel;
            }
            if (nameInput) {
                nameInput.placeholder = radio.dataset.namePlaceholder;
            }
            if (notice) {
                notice.hidden = !(signUp && radio.value === 'institution');
            }
        });
    });
})();
</script>"#;

fn render_auth_page(view: &AuthView<'_>) -> String {
    let sign_up = view.mode == FormMode::SignUp;
    let subtitle = if sign_up {
        "Create your account"
    } else {
        "Sign in to your account"
    };
    let submit_label = if sign_up { "Create Account" } else { "Sign In" };
    let (switch_href, switch_label) = if sign_up {
        ("/auth?mode=signin", "Already have an account? Sign in")
    } else {
        ("/auth?mode=signup", "Don't have an account? Sign up")
    };

    let role_selector = render_role_selector(view.role);

    let sign_up_fields = if sign_up {
        let notice_hidden = if view.role == Role::Institution {
            ""
        } else {
            " hidden"
        };
        format!(
            r#"<label class="field-label" for="full_name" data-name-label-target>{name_label}</label>
                <input id="full_name" name="full_name" type="text" value="{full_name}" placeholder="{placeholder}" required>
                <div class="notice" data-institution-notice{notice_hidden}><strong>Institution Email Required</strong>You must use your official institution email address (e.g., @harvard.edu, @mit.edu). Contact support if your institution domain is not recognized.</div>"#,
            name_label = view.role.name_label(),
            placeholder = view.role.name_placeholder(),
            full_name = escape_html(view.full_name),
        )
    } else {
        String::new()
    };

    let toast_region = render_toast_region(view.toast.as_ref());

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>CertSecure · {submit_label}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
{styles}
    </style>
</head>
<body>
    <main>
        <div class="brand">
            <h1>CertSecure</h1>
            <p>{subtitle}</p>
        </div>
        <section class="panel">
            <form method="post" action="/auth" data-auth-form data-mode="{mode}">
                <input type="hidden" name="mode" value="{mode}">
                {role_selector}
                {sign_up_fields}
                <label class="field-label" for="email">Email</label>
                <input id="email" name="email" type="email" value="{email}" placeholder="Enter your email" required>
                <label class="field-label" for="password">Password</label>
                <input id="password" name="password" type="password" placeholder="Enter your password" required minlength="6">
                <button type="submit">{submit_label}</button>
            </form>
            <div class="switch"><a href="{switch_href}">{switch_label}</a></div>
        </section>
        <div class="aside">
            <p>Secure document verification platform</p>
            <p>Your certificates, verified with confidence</p>
            <div class="demo">
                <p><strong>Example Accounts for Demo:</strong></p>
                <p><strong>Student:</strong> student@example.com / password123</p>
                <p><strong>Employer:</strong> hr@techcorp.com / password123</p>
                <p><strong>Institution:</strong> admin@harvard.edu / password123</p>
                <p><strong>Admin:</strong> admin@verifyed.com / password123</p>
            </div>
        </div>
    </main>
{toast_region}
{toast_script}
{role_script}
</body>
</html>"#,
        styles = AUTH_PAGE_STYLES,
        mode = view.mode.as_str(),
        email = escape_html(view.email),
        toast_script = TOAST_SCRIPT,
        role_script = ROLE_FIELD_SCRIPT,
    )
}
