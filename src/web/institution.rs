use std::borrow::Cow;

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::info;

use crate::{
    session::{CurrentUser, Portal},
    toast::Toast,
    web::{
        AppState, gate,
        templates::{PageLayout, compose_flash, render_page, render_stat_card, render_tab_strip},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Dashboard,
    Upload,
    Search,
    Reports,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Dashboard,
        Section::Upload,
        Section::Search,
        Section::Reports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Dashboard => "dashboard",
            Section::Upload => "upload",
            Section::Search => "search",
            Section::Reports => "reports",
        }
    }

    /// Unknown or missing values land on the dashboard.
    pub fn parse(value: Option<&str>) -> Self {
        Self::ALL
            .into_iter()
            .find(|section| Some(section.as_str()) == value)
            .unwrap_or(Section::Dashboard)
    }
}

const INSTITUTION_STATS: [(&str, &str); 3] = [
    ("Certificates Issued", "1,234"),
    ("Verified This Month", "156"),
    ("Pending Verifications", "23"),
];

#[derive(Default, Deserialize)]
pub struct InstitutionQuery {
    pub section: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
}

pub async fn institution_portal(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<InstitutionQuery>,
) -> Response {
    let user = match gate::require_portal(&state, &jar, Portal::Institution).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let section = Section::parse(params.section.as_deref());
    let toast = compose_flash(params.status.as_deref(), params.error.as_deref());
    Html(render_institution_page(&user, section, toast.as_ref())).into_response()
}

/// Quick actions only acknowledge the click.
pub async fn institution_action(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(action): Path<String>,
) -> Response {
    let user = match gate::require_portal(&state, &jar, Portal::Institution).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match action.as_str() {
        "upload" => {
            info!(user = %user.email, "institution single upload requested");
            Redirect::to("/institution?status=upload_certificate").into_response()
        }
        "bulk_upload" => {
            info!(user = %user.email, "institution bulk upload requested");
            Redirect::to("/institution?status=bulk_upload").into_response()
        }
        _ => Redirect::to("/institution?error=unknown_action").into_response(),
    }
}

fn render_institution_page(user: &CurrentUser, section: Section, toast: Option<&Toast>) -> String {
    let stats = INSTITUTION_STATS
        .iter()
        .map(|(label, value)| render_stat_card(label, value))
        .collect::<String>();

    let tab_names = Section::ALL.map(|section| section.as_str());
    let tabs = render_tab_strip("/institution", "section", &tab_names, section.as_str());

    let content = match section {
        Section::Dashboard => render_dashboard_section(),
        Section::Upload => UPLOAD_SECTION.to_string(),
        Section::Search => SEARCH_SECTION.to_string(),
        Section::Reports => REPORTS_SECTION.to_string(),
    };

    let body = format!(
        r#"        <div class="container">
            <h1>Institution Portal</h1>
            <p class="muted">Manage your institution's certificates and verification requests</p>
            <div class="grid three">{stats}</div>
            {tabs}
            {content}
        </div>"#
    );

    render_page(PageLayout {
        meta_title: "Institution Portal · CertSecure",
        user: Some(user),
        active: Some(Portal::Institution),
        toast,
        body_html: Cow::Owned(body),
        extra_style_blocks: Vec::new(),
        body_scripts: Vec::new(),
    })
}

fn render_dashboard_section() -> String {
    r#"<div class="grid two">
                <div class="panel">
                    <h3>Recent Activity</h3>
                    <div class="row"><div><p><strong>Certificate Verified</strong></p><p class="muted">Rajesh Kumar - BCE-2023-001</p></div><span class="muted text-success">2 hours ago</span></div>
                    <div class="row"><div><p><strong>New Certificate Added</strong></p><p class="muted">Priya Sharma - BCE-2023-002</p></div><span class="muted">5 hours ago</span></div>
                </div>
                <div class="panel actions">
                    <h3>Quick Actions</h3>
                    <form method="post" action="/institution/actions/upload"><button type="submit" class="primary">Upload Single Certificate</button></form>
                    <form method="post" action="/institution/actions/bulk_upload"><button type="submit">Bulk Upload Certificates</button></form>
                    <a class="btn" href="/institution?section=search">Search Certificates</a>
                </div>
            </div>"#
        .to_string()
}

const UPLOAD_SECTION: &str = r#"<div class="panel">
                <h3>Add New Certificate</h3>
                <form method="post" action="/institution/actions/upload">
                    <div class="grid two">
                        <div class="field"><label for="studentName">Student Name</label><input id="studentName" name="student_name" placeholder="Enter student full name"></div>
                        <div class="field"><label for="certificateNumber">Certificate Number</label><input id="certificateNumber" name="certificate_number" placeholder="Enter certificate number"></div>
                        <div class="field"><label for="courseName">Course Name</label><input id="courseName" name="course_name" placeholder="Enter course name"></div>
                        <div class="field"><label for="completionDate">Completion Date</label><input id="completionDate" name="completion_date" type="date"></div>
                        <div class="field"><label for="grade">Grade/Marks</label><input id="grade" name="grade" placeholder="Enter grade or marks"></div>
                        <div class="field"><label for="documentType">Document Type</label><input id="documentType" name="document_type" placeholder="e.g., Degree, Diploma"></div>
                    </div>
                    <div class="field"><label for="metadata">Additional Information</label><textarea id="metadata" name="metadata" placeholder="Any additional information about the certificate"></textarea></div>
                    <div class="actions"><button type="submit" class="primary">Add Certificate to Database</button></div>
                </form>
            </div>"#;

const SEARCH_SECTION: &str = r#"<div class="panel">
                <h3>Search Certificates</h3>
                <div class="field"><input type="search" placeholder="Search by student name, certificate number, or course"></div>
                <p class="placeholder">Enter search criteria to find certificates</p>
            </div>"#;

const REPORTS_SECTION: &str = r#"<div class="panel">
                <h3>Reports &amp; Analytics</h3>
                <p class="placeholder">Reports and analytics interface coming soon</p>
            </div>"#;

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::session::Role;

    fn institution_user() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "registrar@mit.edu".to_string(),
            full_name: Some("MIT".to_string()),
            role: Role::Institution,
        }
    }

    #[test]
    fn unknown_sections_fall_back_to_dashboard() {
        assert_eq!(Section::parse(Some("upload")), Section::Upload);
        assert_eq!(Section::parse(Some("settings")), Section::Dashboard);
        assert_eq!(Section::parse(None), Section::Dashboard);
    }

    #[test]
    fn dashboard_shows_stats_and_actions() {
        let html = render_institution_page(&institution_user(), Section::Dashboard, None);
        assert!(html.contains("1,234"));
        assert!(html.contains("Pending Verifications"));
        assert!(html.contains("BCE-2023-002"));
        assert!(html.contains(r#"action="/institution/actions/bulk_upload""#));
        assert!(html.contains(r#"href="/institution?section=dashboard" class="active""#));
    }

    #[test]
    fn each_section_renders_its_panel() {
        let user = institution_user();
        let upload = render_institution_page(&user, Section::Upload, None);
        assert!(upload.contains("Add Certificate to Database"));
        assert!(upload.contains("e.g., Degree, Diploma"));

        let search = render_institution_page(&user, Section::Search, None);
        assert!(search.contains("Enter search criteria to find certificates"));

        let reports = render_institution_page(&user, Section::Reports, None);
        assert!(reports.contains("coming soon"));
    }
}
