use std::borrow::Cow;

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use crate::{
    session::{CurrentUser, Portal},
    toast::Toast,
    web::{
        AppState, escape_html, gate,
        templates::{PageLayout, compose_flash, render_page, render_stat_card, render_tab_strip},
    },
};

use super::types::{AdminTab, DashboardQuery};

const ADMIN_STATS: [(&str, &str); 4] = [
    ("Total Verifications", "12,543"),
    ("Active Institutions", "245"),
    ("Registered Users", "8,924"),
    ("Success Rate", "94.2%"),
];

struct RecentVerification {
    student: &'static str,
    institution: &'static str,
    status: &'static str,
    date: &'static str,
}

const RECENT_VERIFICATIONS: [RecentVerification; 3] = [
    RecentVerification {
        student: "Rajesh Kumar",
        institution: "NIT Jamshedpur",
        status: "Verified",
        date: "2024-01-15",
    },
    RecentVerification {
        student: "Priya Sharma",
        institution: "BIT Mesra",
        status: "Pending",
        date: "2024-01-15",
    },
    RecentVerification {
        student: "Amit Singh",
        institution: "IIT Dhanbad",
        status: "Invalid",
        date: "2024-01-14",
    },
];

/// Institutions tab content: the allow-list, or the reason it could not be read.
type DomainListing = Result<Vec<String>, String>;

pub async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<DashboardQuery>,
) -> Response {
    let user = match gate::require_portal(&state, &jar, Portal::Admin).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let tab = AdminTab::parse(params.tab.as_deref());
    let domains = if tab == AdminTab::Institutions {
        match state.auth().verified_institution_domains().await {
            Ok(domains) => Some(Ok(domains)),
            Err(err) => {
                warn!(%err, "failed to load verified institution domains");
                Some(Err(err.user_message()))
            }
        }
    } else {
        None
    };

    let toast = compose_flash(params.status.as_deref(), params.error.as_deref());
    Html(render_dashboard(&user, tab, domains.as_ref(), toast.as_ref())).into_response()
}

fn status_class(status: &str) -> &'static str {
    match status {
        "Verified" => "text-success",
        "Pending" => "text-warning",
        _ => "text-destructive",
    }
}

fn render_dashboard(
    user: &CurrentUser,
    tab: AdminTab,
    domains: Option<&DomainListing>,
    toast: Option<&Toast>,
) -> String {
    let stats = ADMIN_STATS
        .iter()
        .map(|(label, value)| render_stat_card(label, value))
        .collect::<String>();

    let tab_names = AdminTab::ALL.map(|tab| tab.as_str());
    let tabs = render_tab_strip("/admin", "tab", &tab_names, tab.as_str());

    let content = match tab {
        AdminTab::Overview => render_overview(),
        AdminTab::Institutions => render_institutions(domains),
        AdminTab::Users => placeholder_panel("User Management", "User management interface coming soon"),
        AdminTab::Verifications => placeholder_panel(
            "Verification Management",
            "Verification management interface coming soon",
        ),
    };

    let body = format!(
        r#"        <div class="container">
            <h1>Admin Dashboard</h1>
            <p class="muted">Manage institutions, users, and verification requests</p>
            <div class="grid four">{stats}</div>
            {tabs}
            {content}
        </div>"#
    );

    render_page(PageLayout {
        meta_title: "Admin Dashboard · CertSecure",
        user: Some(user),
        active: Some(Portal::Admin),
        toast,
        body_html: Cow::Owned(body),
        extra_style_blocks: Vec::new(),
        body_scripts: Vec::new(),
    })
}

fn render_overview() -> String {
    let rows = RECENT_VERIFICATIONS
        .iter()
        .map(|row| {
            format!(
                r#"<div class="row"><div><p><strong>{student}</strong></p><p class="muted">{institution}</p></div><div style="text-align: right"><p class="{class}"><strong>{status}</strong></p><p class="muted">{date}</p></div></div>"#,
                student = row.student,
                institution = row.institution,
                class = status_class(row.status),
                status = row.status,
                date = row.date,
            )
        })
        .collect::<String>();

    format!(
        r#"<div class="grid two">
                <div class="panel">
                    <h3>Recent Verifications</h3>
                    {rows}
                </div>
                <div class="panel actions">
                    <h3>Quick Actions</h3>
                    <form method="post" action="/admin/actions/add_institution"><button type="submit" class="primary">Add New Institution</button></form>
                    <a class="btn" href="/admin?tab=verifications">Search Verifications</a>
                    <a class="btn" href="/admin?tab=verifications">Generate Reports</a>
                </div>
            </div>"#
    )
}

fn render_institutions(domains: Option<&DomainListing>) -> String {
    let listing = match domains {
        Some(Ok(domains)) if domains.is_empty() => {
            r#"<p class="placeholder">No verified institution domains yet</p>"#.to_string()
        }
        Some(Ok(domains)) => domains
            .iter()
            .map(|domain| {
                format!(
                    r#"<div class="row"><p><strong>{domain}</strong></p><span class="muted text-success">Verified</span></div>"#,
                    domain = escape_html(domain),
                )
            })
            .collect::<String>(),
        Some(Err(message)) => format!(
            r#"<p class="placeholder text-destructive">{message}</p>"#,
            message = escape_html(message),
        ),
        None => r#"<p class="placeholder">Institution management interface coming soon</p>"#
            .to_string(),
    };

    format!(
        r#"<div class="panel">
                <div class="row" style="background: none; padding: 0"><h3>Institution Management</h3><form method="post" action="/admin/actions/add_institution"><button type="submit" class="btn primary">Add Institution</button></form></div>
                <p class="muted">Verified institution email domains</p>
                {listing}
            </div>"#
    )
}

fn placeholder_panel(title: &str, message: &str) -> String {
    format!(
        r#"<div class="panel">
                <h3>{title}</h3>
                <p class="placeholder">{message}</p>
            </div>"#
    )
}
