use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: String,
    pub revenue: f64,
}

/// Revenue summary computed server-side over completed appointments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevenueAnalytics {
    #[serde(default)]
    pub total_revenue: f64,
    #[serde(default)]
    pub total_appointments: i64,
    #[serde(default)]
    pub average_ticket: f64,
    #[serde(default)]
    pub chart_data: Vec<ChartPoint>,
}

impl RevenueAnalytics {
    /// The most recent `n` chart points, oldest first.
    pub fn recent_points(&self, n: usize) -> &[ChartPoint] {
        let start = self.chart_data.len().saturating_sub(n);
        &self.chart_data[start..]
    }
}
