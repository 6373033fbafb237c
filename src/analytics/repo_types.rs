use serde::Serialize;
use sqlx::FromRow;

/// A headline number for the analytics dashboard.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Statistic {
    pub title: String,
    pub description: String,
    pub statistic: String,
    pub prefix: String,
    pub suffix: String,
}

impl Statistic {
    fn new(title: &str, description: String, statistic: String, suffix: &str) -> Self {
        Self {
            title: title.to_string(),
            description,
            statistic,
            prefix: String::new(),
            suffix: suffix.to_string(),
        }
    }

    pub fn monthly_interactions(count: i64) -> Self {
        Self::new(
            "Total Monthly Interactions",
            "Total number of interactions in the last month".into(),
            count.to_string(),
            "",
        )
    }

    pub fn monthly_most_consulted(document: String) -> Self {
        Self::new(
            "Monthly Most Consulted Data",
            "Most consulted data in the last month".into(),
            document,
            "",
        )
    }

    pub fn monthly_users(count: i64) -> Self {
        Self::new("Total Users", "Total number of users".into(), count.to_string(), "Users")
    }

    pub fn interactions_between(count: i64, start: &str, end: &str) -> Self {
        Self::new(
            "Interactions in Date Range",
            format!("Total interactions between {start} and {end}"),
            count.to_string(),
            "interactions",
        )
    }

    pub fn most_consulted_between(document: String, start: &str, end: &str) -> Self {
        Self::new(
            "Most Consulted Data in Date Range",
            format!("Most consulted data between {start} and {end}"),
            document,
            "",
        )
    }

    pub fn users_between(count: i64, start: &str, end: &str) -> Self {
        Self::new(
            "Users in Date Range",
            format!("Total new users between {start} and {end}"),
            count.to_string(),
            "users",
        )
    }
}

/// One bucket of a daily series; `date` is `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct DailyStatistic {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportLink {
    pub download_url: String,
}
