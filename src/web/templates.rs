use std::borrow::Cow;

use chrono::{Datelike, Utc};

use crate::{
    session::{CurrentUser, Portal, Role},
    toast::Toast,
};

const BASE_STYLES: &str = r#"
        :root { color-scheme: light; }
        body { font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; background: #f8fafc; color: #0f172a; min-height: 100vh; display: flex; flex-direction: column; }
        a { color: #2563eb; }
        header.site-header { background: #ffffff; border-bottom: 1px solid #e2e8f0; box-shadow: 0 6px 18px rgba(15, 23, 42, 0.04); }
        .header-bar { max-width: 1120px; margin: 0 auto; padding: 1rem 1.5rem; display: flex; justify-content: space-between; align-items: center; flex-wrap: wrap; gap: 1rem; }
        .brand { display: flex; align-items: center; gap: 0.75rem; text-decoration: none; color: inherit; }
        .brand-mark { width: 2.5rem; height: 2.5rem; border-radius: 10px; background: linear-gradient(135deg, #1d4ed8, #0ea5e9); color: #ffffff; display: inline-flex; align-items: center; justify-content: center; font-weight: 700; }
        .brand strong { display: block; font-size: 1.2rem; }
        .brand span { display: block; font-size: 0.85rem; color: #64748b; }
        nav.site-nav { display: flex; align-items: center; gap: 0.5rem; flex-wrap: wrap; }
        nav.site-nav a { padding: 0.5rem 0.9rem; border-radius: 999px; text-decoration: none; color: #0f172a; font-weight: 600; }
        nav.site-nav a:hover, nav.site-nav a.active { background: #e0f2fe; color: #1d4ed8; }
        .session-box { display: flex; align-items: center; gap: 0.75rem; color: #475569; font-size: 0.9rem; }
        .session-box form { margin: 0; }
        .session-box button { padding: 0.5rem 1rem; border: none; border-radius: 999px; background: #2563eb; color: #ffffff; font-weight: 600; cursor: pointer; }
        .session-box button:hover { background: #1d4ed8; }
        main { flex: 1; width: 100%; box-sizing: border-box; }
        .container { max-width: 1120px; margin: 0 auto; padding: 2rem 1.5rem; box-sizing: border-box; }
        .panel { background: #ffffff; border-radius: 16px; border: 1px solid #e2e8f0; padding: 1.5rem; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.08); }
        .panel h3 { margin-top: 0; }
        .grid { display: grid; gap: 1.5rem; }
        .grid.two { grid-template-columns: repeat(auto-fit, minmax(320px, 1fr)); }
        .grid.three { grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); }
        .grid.four { grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); }
        .stat-card { display: flex; justify-content: space-between; align-items: center; }
        .stat-card p { margin: 0; }
        .stat-label { color: #64748b; font-size: 0.9rem; }
        .stat-value { font-size: 1.6rem; font-weight: 700; }
        .tabs { display: flex; gap: 0.75rem; flex-wrap: wrap; margin: 2rem 0 1.5rem; }
        .tabs a { padding: 0.55rem 1.1rem; border-radius: 8px; border: 1px solid #cbd5e1; text-decoration: none; color: #0f172a; font-weight: 600; text-transform: capitalize; }
        .tabs a.active { background: #2563eb; border-color: #2563eb; color: #ffffff; }
        .row { display: flex; justify-content: space-between; align-items: center; padding: 0.75rem 1rem; background: #f1f5f9; border-radius: 10px; margin-bottom: 0.75rem; }
        .row p { margin: 0; }
        .muted { color: #64748b; font-size: 0.9rem; }
        .text-success { color: #15803d; }
        .text-warning { color: #b45309; }
        .text-destructive { color: #b91c1c; }
        .actions form { margin: 0 0 0.75rem; }
        .actions button, .btn { width: 100%; text-align: left; padding: 0.8rem 1rem; border-radius: 8px; border: 1px solid #cbd5e1; background: #ffffff; color: #0f172a; font-weight: 600; cursor: pointer; }
        .actions button.primary, .btn.primary { background: #2563eb; border-color: #2563eb; color: #ffffff; }
        .placeholder { text-align: center; padding: 3rem 1rem; color: #64748b; }
        label { display: block; margin-bottom: 0.4rem; font-weight: 600; }
        input, textarea { width: 100%; padding: 0.75rem; border-radius: 8px; border: 1px solid #cbd5e1; background: #f8fafc; color: #0f172a; font-size: 0.95rem; box-sizing: border-box; }
        input:focus, textarea:focus { outline: none; border-color: #2563eb; box-shadow: 0 0 0 3px rgba(37, 99, 235, 0.12); }
        .field { margin-bottom: 1.1rem; }
        .toast-region { position: fixed; right: 1.25rem; bottom: 1.25rem; display: flex; flex-direction: column; gap: 0.75rem; z-index: 50; max-width: 360px; }
        .toast { background: #ffffff; border: 1px solid #e2e8f0; border-radius: 12px; padding: 0.9rem 1.1rem; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.15); }
        .toast strong { display: block; margin-bottom: 0.2rem; }
        .toast p { margin: 0; font-size: 0.9rem; color: #475569; }
        .toast.destructive { background: #b91c1c; border-color: #b91c1c; color: #ffffff; }
        .toast.destructive p { color: #fee2e2; }
        .app-footer { background: #ffffff; border-top: 1px solid #e2e8f0; margin-top: 3rem; }
        .footer-grid { max-width: 1120px; margin: 0 auto; padding: 2.5rem 1.5rem 1rem; display: grid; gap: 2rem; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); font-size: 0.9rem; color: #64748b; }
        .footer-grid h4 { color: #0f172a; margin: 0 0 0.75rem; }
        .footer-grid a { display: block; color: #64748b; text-decoration: none; margin-bottom: 0.4rem; }
        .footer-grid a:hover { color: #2563eb; }
        .footer-note { text-align: center; padding: 1rem 1.5rem 2rem; font-size: 0.85rem; color: #94a3b8; border-top: 1px solid #e2e8f0; }
        @media (max-width: 768px) {
            .header-bar { flex-direction: column; align-items: flex-start; }
            .container { padding: 1.5rem 1rem; }
        }
"#;

/// Dismisses server-rendered toasts and exposes `window.certToast` for page scripts.
pub const TOAST_SCRIPT: &str = r#"<script>
(function() {
    const region = document.getElementById('toast-region');
    function dismissLater(el) {
        setTimeout(() => el.remove(), 5000);
    }
    window.certToast = function(title, description, destructive) {
        if (!region) {
            return;
        }
        const el = document.createElement('div');
        el.className = destructive ? 'toast destructive' : 'toast';
        el.setAttribute('role', 'status');
        const heading = document.createElement('strong');
        heading.textContent = title;
        const body = document.createElement('p');
        body.textContent = description;
        el.appendChild(heading);
        el.appendChild(body);
        region.appendChild(el);
        dismissLater(el);
    };
    if (region) {
        region.querySelectorAll('.toast').forEach(dismissLater);
    }
})();
</script>"#;

pub struct PageLayout<'a> {
    pub meta_title: &'a str,
    pub user: Option<&'a CurrentUser>,
    pub active: Option<Portal>,
    pub toast: Option<&'a Toast>,
    pub body_html: Cow<'a, str>,
    pub extra_style_blocks: Vec<Cow<'a, str>>,
    pub body_scripts: Vec<Cow<'a, str>>,
}

pub fn render_page(layout: PageLayout<'_>) -> String {
    let PageLayout {
        meta_title,
        user,
        active,
        toast,
        body_html,
        extra_style_blocks,
        body_scripts,
    } = layout;

    let styles = std::iter::once(Cow::Borrowed(BASE_STYLES))
        .chain(extra_style_blocks)
        .map(|block| block.into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    let scripts = std::iter::once(Cow::Borrowed(TOAST_SCRIPT))
        .chain(body_scripts)
        .map(|script| script.into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    let header = render_header(user, active);
    let toast_region = render_toast_region(toast);
    let footer = render_footer();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{meta_title}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
{styles}
    </style>
</head>
<body>
{header}
    <main>
{body_html}
    </main>
{footer}
{toast_region}
{scripts}
</body>
</html>"#,
        meta_title = escape_html(meta_title),
    )
}

fn render_header(user: Option<&CurrentUser>, active: Option<Portal>) -> String {
    let nav_link = |portal: Portal, href: &str, label: &str| {
        let class = if active == Some(portal) {
            r#" class="active""#
        } else {
            ""
        };
        format!(r#"<a href="{href}"{class}>{label}</a>"#)
    };

    let (nav, session) = match user {
        Some(user) => {
            let mut links = vec![nav_link(Portal::Verify, "/#verify", "Verify Certificate")];
            if user.role.can_access(Portal::Institution) {
                links.push(nav_link(Portal::Institution, "/institution", "Institution Portal"));
            }
            if user.role.can_access(Portal::Admin) {
                links.push(nav_link(Portal::Admin, "/admin", "Admin Dashboard"));
            }
            let session = format!(
                r#"<div class="session-box"><span><strong>{name}</strong> · {role}</span><form method="post" action="/logout"><button type="submit">Sign Out</button></form></div>"#,
                name = escape_html(user.display_name()),
                role = user.role.label(),
            );
            (links.join(""), session)
        }
        None => (
            String::new(),
            r#"<div class="session-box"><a href="/auth">Sign In</a></div>"#.to_string(),
        ),
    };

    format!(
        r#"    <header class="site-header">
        <div class="header-bar">
            <a class="brand" href="/"><span class="brand-mark">CS</span><span><strong>CertSecure</strong><span>Jharkhand Academic Verification System</span></span></a>
            <nav class="site-nav">{nav}</nav>
            {session}
        </div>
    </header>"#
    )
}

pub fn render_toast(toast: &Toast) -> String {
    let class = if toast.is_destructive() {
        "toast destructive"
    } else {
        "toast"
    };
    format!(
        r#"<div class="{class}" role="status"><strong>{title}</strong><p>{description}</p></div>"#,
        title = escape_html(&toast.title),
        description = escape_html(&toast.description),
    )
}

pub fn render_toast_region(toast: Option<&Toast>) -> String {
    let inner = toast.map(render_toast).unwrap_or_default();
    format!(r#"<div class="toast-region" id="toast-region" aria-live="polite">{inner}</div>"#)
}

/// One account-type picker shared by the sign-in and sign-up forms.
pub fn render_role_selector(selected: Role) -> String {
    let options = Role::ALL
        .iter()
        .map(|role| {
            let checked = if *role == selected { " checked" } else { "" };
            format!(
                r#"<label class="role-option"><input type="radio" name="role" value="{value}" data-name-label="{name_label}" data-name-placeholder="{placeholder}"{checked}><span class="role-title">{label}</span><span class="role-desc">{description}</span></label>"#,
                value = role.as_str(),
                name_label = role.name_label(),
                placeholder = role.name_placeholder(),
                label = role.label(),
                description = role.description(),
            )
        })
        .collect::<String>();

    format!(
        r#"<fieldset class="role-selector"><legend>Account Type</legend><div class="role-grid">{options}</div></fieldset>"#
    )
}

pub fn render_stat_card(label: &str, value: &str) -> String {
    format!(
        r#"<div class="panel stat-card"><div><p class="stat-label">{label}</p><p class="stat-value">{value}</p></div></div>"#,
        label = escape_html(label),
        value = escape_html(value),
    )
}

/// Link strip for pages that switch sections through a query parameter.
pub fn render_tab_strip(base_path: &str, param: &str, tabs: &[&str], active: &str) -> String {
    let links = tabs
        .iter()
        .map(|tab| {
            let class = if *tab == active { r#" class="active""# } else { "" };
            format!(r#"<a href="{base_path}?{param}={tab}"{class}>{tab}</a>"#)
        })
        .collect::<String>();
    format!(r#"<nav class="tabs">{links}</nav>"#)
}

/// Maps the `status` / `error` query codes used by redirects to a toast.
pub fn compose_flash(status: Option<&str>, error: Option<&str>) -> Option<Toast> {
    if let Some(status) = status {
        let toast = match status {
            "signed_in" => Some(Toast::info(
                "Welcome Back",
                "You have been signed in successfully",
            )),
            "signed_out" => Some(Toast::info("Signed Out", "You have been signed out")),
            "upload_certificate" => Some(Toast::info(
                "Upload Certificate",
                "Certificate upload interface would open here",
            )),
            "bulk_upload" => Some(Toast::info(
                "Bulk Upload",
                "Bulk certificate upload interface would open here",
            )),
            "add_institution" => Some(Toast::info(
                "Add Institution",
                "Institution management interface would open here",
            )),
            _ => None,
        };
        if toast.is_some() {
            return toast;
        }
    }

    error.map(|error| match error {
        "not_authorized" => Toast::error(
            "Access Denied",
            "Your account does not have access to that area",
        ),
        _ => Toast::error("Error", "An unexpected error occurred"),
    })
}

pub fn render_footer() -> String {
    let year = Utc::now().year();
    format!(
        r#"    <footer class="app-footer">
        <div class="footer-grid">
            <div>
                <h4>CertSecure</h4>
                <p>Academic Verification System</p>
                <p>Protecting academic integrity across Jharkhand with cutting-edge verification technology.</p>
            </div>
            <div>
                <h4>Quick Links</h4>
                <a href="/#verify">Verify Certificate</a>
                <a href="/institution">Institution Portal</a>
                <a href="/admin">Admin Dashboard</a>
                <a href="/#verify">API Documentation</a>
            </div>
            <div>
                <h4>Support</h4>
                <a href="mailto:support@certsecure.gov.in">Help Center</a>
                <a href="mailto:support@certsecure.gov.in">User Guide</a>
                <a href="mailto:support@certsecure.gov.in">Contact Support</a>
                <a href="/healthz">System Status</a>
            </div>
            <div>
                <h4>Contact</h4>
                <p>support@certsecure.gov.in</p>
                <p>+91 651-2345-678</p>
                <p>Higher Education Department<br>Government of Jharkhand<br>Ranchi - 834001</p>
            </div>
        </div>
        <p class="footer-note">© {year} CertSecure - Government of Jharkhand. All rights reserved.</p>
    </footer>"#
    )
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
