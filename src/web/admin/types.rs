use serde::Deserialize;

#[derive(Default, Deserialize)]
pub struct DashboardQuery {
    pub tab: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminTab {
    Overview,
    Institutions,
    Users,
    Verifications,
}

impl AdminTab {
    pub const ALL: [AdminTab; 4] = [
        AdminTab::Overview,
        AdminTab::Institutions,
        AdminTab::Users,
        AdminTab::Verifications,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminTab::Overview => "overview",
            AdminTab::Institutions => "institutions",
            AdminTab::Users => "users",
            AdminTab::Verifications => "verifications",
        }
    }

    pub fn parse(value: Option<&str>) -> Self {
        Self::ALL
            .into_iter()
            .find(|tab| Some(tab.as_str()) == value)
            .unwrap_or(AdminTab::Overview)
    }
}
