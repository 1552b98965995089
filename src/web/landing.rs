use std::borrow::Cow;

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::{
    session::{CurrentUser, Portal},
    toast::Toast,
    verification::MAX_UPLOAD_BYTES,
    web::{
        AppState, gate,
        templates::{PageLayout, compose_flash, render_page},
    },
};

pub const VERIFY_CLIENT_SCRIPT: &str = concat!(
    "<script>\n",
    include_str!("verify_client.js"),
    "\n</script>",
);

const HOME_STYLES: &str = r#"
        .hero { background: linear-gradient(135deg, #eff6ff, #f8fafc 60%, #ecfeff); padding: 4.5rem 1.5rem; text-align: center; }
        .hero h1 { font-size: clamp(2.2rem, 5vw, 3.4rem); margin: 0 0 1.25rem; line-height: 1.15; }
        .hero h1 span { display: block; background: linear-gradient(135deg, #1d4ed8, #0ea5e9); -webkit-background-clip: text; background-clip: text; color: transparent; }
        .hero p.lead { max-width: 640px; margin: 0 auto 2rem; color: #475569; font-size: 1.15rem; line-height: 1.6; }
        .hero-actions { display: flex; gap: 1rem; justify-content: center; flex-wrap: wrap; margin-bottom: 3rem; }
        .hero-actions a { min-width: 12rem; padding: 0.9rem 1.4rem; border-radius: 12px; font-weight: 600; text-decoration: none; border: 1px solid #2563eb; }
        .hero-actions a.primary { background: #2563eb; color: #ffffff; }
        .hero-actions a.outline { background: #ffffff; color: #1d4ed8; }
        .features { max-width: 1000px; margin: 0 auto; text-align: left; }
        .features h3 { margin: 0 0 0.5rem; }
        .features p { margin: 0; color: #64748b; font-size: 0.92rem; line-height: 1.5; }
        .section-title { text-align: center; margin-bottom: 2.5rem; }
        .section-title h2 { font-size: 2rem; margin: 0 0 0.75rem; }
        .section-title p { color: #64748b; margin: 0 auto; max-width: 640px; }
        .dropzone { border: 2px dashed #cbd5e1; border-radius: 12px; padding: 2rem; text-align: center; cursor: pointer; color: #64748b; margin-bottom: 1.5rem; }
        .dropzone:hover, .dropzone[data-state="dragover"] { border-color: #2563eb; background: #eff6ff; }
        .dropzone h3 { color: #0f172a; margin: 0 0 0.4rem; }
        .file-info { display: flex; gap: 0.75rem; align-items: center; background: #f1f5f9; border-radius: 10px; padding: 0.75rem 1rem; margin-bottom: 1.5rem; }
        .file-info[hidden] { display: none; }
        .file-info [data-file-name] { flex: 1; font-weight: 600; overflow: hidden; text-overflow: ellipsis; white-space: nowrap; }
        .verify-button { width: 100%; padding: 0.95rem; border: none; border-radius: 12px; background: #2563eb; color: #ffffff; font-weight: 600; font-size: 1.05rem; cursor: pointer; }
        .verify-button:disabled { opacity: 0.55; cursor: not-allowed; }
        .status-headline { margin: 0 0 1.25rem; font-size: 1.15rem; color: #64748b; }
        .status-headline[data-status="verified"] { color: #15803d; }
        .status-headline[data-status="invalid"], .status-headline[data-status="error"] { color: #b91c1c; }
        .status-headline[data-status="uploading"], .status-headline[data-status="processing"] { color: #2563eb; }
        .progress[hidden] { display: none; }
        .progress-track { height: 0.5rem; background: #e2e8f0; border-radius: 999px; overflow: hidden; }
        .progress-track div { height: 100%; background: #2563eb; transition: width 0.3s ease; }
        .result-card { border-radius: 12px; padding: 1rem; }
        .result-card.success { background: #f0fdf4; border: 1px solid #bbf7d0; }
        .result-card.destructive { background: #fef2f2; border: 1px solid #fecaca; }
        .result-head { display: flex; justify-content: space-between; margin-bottom: 0.75rem; }
        .result-card.success .result-head { color: #15803d; }
        .result-card.destructive .result-head { color: #b91c1c; }
        .result-grid { display: grid; grid-template-columns: 1fr 1fr; gap: 0.75rem; font-size: 0.9rem; }
        .result-grid .wide { grid-column: span 2; }
        .result-grid p { margin: 0; }
        .result-grid .value { font-weight: 600; }
        .stats-band { background: #f1f5f9; }
        .stat-tile { text-align: center; }
        .stat-tile p { margin: 0.2rem 0; }
        .stat-tile .stat-value { font-size: 2rem; }
"#;

struct HomeStat {
    value: &'static str,
    label: &'static str,
    description: &'static str,
}

const HOME_STATS: [HomeStat; 4] = [
    HomeStat {
        value: "50,000+",
        label: "Certificates Verified",
        description: "Successfully authenticated documents",
    },
    HomeStat {
        value: "99.8%",
        label: "Accuracy Rate",
        description: "AI-powered fraud detection",
    },
    HomeStat {
        value: "200+",
        label: "Partner Institutions",
        description: "Across Jharkhand state",
    },
    HomeStat {
        value: "85%",
        label: "Fraud Reduction",
        description: "Since implementation",
    },
];

#[derive(Default, Deserialize)]
pub struct LandingQuery {
    pub status: Option<String>,
    pub error: Option<String>,
}

pub async fn home_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<LandingQuery>,
) -> Response {
    let user = match gate::require_portal(&state, &jar, Portal::Verify).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let toast = compose_flash(params.status.as_deref(), params.error.as_deref());
    Html(render_home_page(&user, toast.as_ref())).into_response()
}

fn render_home_page(user: &CurrentUser, toast: Option<&Toast>) -> String {
    let institution_href = if user.role.can_access(Portal::Institution) {
        "/institution"
    } else {
        "/auth?mode=signin&role=institution"
    };

    let body = format!(
        "{hero}\n{verify}\n{stats}",
        hero = render_hero(institution_href),
        verify = render_verify_section(),
        stats = render_stats_section(),
    );

    render_page(PageLayout {
        meta_title: "CertSecure · Academic Certificate Verification",
        user: Some(user),
        active: Some(Portal::Verify),
        toast,
        body_html: Cow::Owned(body),
        extra_style_blocks: vec![Cow::Borrowed(HOME_STYLES)],
        body_scripts: vec![Cow::Borrowed(VERIFY_CLIENT_SCRIPT)],
    })
}

fn render_hero(institution_href: &str) -> String {
    format!(
        r##"        <section class="hero">
            <h1>Secure Academic <span>Verification System</span></h1>
            <p class="lead">Protecting academic integrity across Jharkhand with AI-powered certificate verification, blockchain security, and real-time fraud detection.</p>
            <div class="hero-actions">
                <a class="primary" href="#verify">Verify Certificate</a>
                <a class="outline" href="{institution_href}">Institution Login</a>
            </div>
            <div class="grid three features">
                <div class="panel"><h3>AI-Powered Detection</h3><p>Advanced OCR and machine learning algorithms detect tampered documents and forged credentials instantly.</p></div>
                <div class="panel"><h3>Blockchain Security</h3><p>Immutable verification records with cryptographic validation ensure document authenticity.</p></div>
                <div class="panel"><h3>Instant Verification</h3><p>Real-time document processing with comprehensive database cross-referencing in seconds.</p></div>
            </div>
        </section>"##
    )
}

fn render_verify_section() -> String {
    format!(
        r#"        <section class="container" id="verify" data-verify-widget data-max-bytes="{max_bytes}">
            <div class="section-title">
                <h2>Verify Academic Certificate</h2>
                <p>Upload your certificate for instant verification against our secure database</p>
            </div>
            <div class="grid two">
                <div class="panel">
                    <div class="dropzone" data-dropzone>
                        <h3>Drop your certificate here</h3>
                        <p>or click to browse files</p>
                        <p class="muted">Supports PDF, JPG, PNG (max 10MB)</p>
                    </div>
                    <input type="file" accept=".pdf,.jpg,.jpeg,.png" hidden>
                    <div class="file-info" data-file-info hidden>
                        <span data-file-name></span>
                        <span class="muted" data-file-size></span>
                    </div>
                    <button type="button" class="verify-button" data-verify-button disabled>Verify Certificate</button>
                </div>
                <div class="panel">
                    <h3 class="status-headline" data-status-headline data-status="idle">Ready to verify</h3>
                    <div class="progress" data-progress hidden>
                        <div class="progress-track"><div data-progress-bar style="width: 0%"></div></div>
                        <p class="muted" data-progress-detail></p>
                    </div>
                    <div data-result><p class="placeholder">Upload a certificate to begin verification</p></div>
                </div>
            </div>
        </section>"#,
        max_bytes = MAX_UPLOAD_BYTES,
    )
}

fn render_stats_section() -> String {
    let tiles = HOME_STATS
        .iter()
        .map(|stat| {
            format!(
                r#"<div class="panel stat-tile"><p class="stat-value">{value}</p><p><strong>{label}</strong></p><p class="muted">{description}</p></div>"#,
                value = stat.value,
                label = stat.label,
                description = stat.description,
            )
        })
        .collect::<String>();

    format!(
        r#"        <section class="stats-band">
            <div class="container">
                <div class="section-title">
                    <h2>Trusted by Educational Institutions</h2>
                    <p>Our verification system has become the gold standard for academic credential authentication across Jharkhand.</p>
                </div>
                <div class="grid four">{tiles}</div>
            </div>
        </section>"#
    )
}
