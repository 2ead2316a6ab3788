use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentStatus {
    Confirmed,
    Completed,
    Cancelled,
    Unknown,
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppointmentStatus::Confirmed => write!(f, "Confirmed"),
            AppointmentStatus::Completed => write!(f, "Completed"),
            AppointmentStatus::Cancelled => write!(f, "Cancelled"),
            AppointmentStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskPriority {
    Low = 0,
    Normal = 1,
    High = 2,
}

impl TaskPriority {
    /// Lenient parse: anything unrecognized is `Normal`.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "low" => TaskPriority::Low,
            "high" => TaskPriority::High,
            _ => TaskPriority::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Normal => "normal",
            TaskPriority::High => "high",
        }
    }
}

/// A service offered by the barbershop (haircut, beard trim, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub duration: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub visits: i64,
    #[serde(default)]
    pub total_spent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub service_id: String,
    pub service_name: String,
    /// YYYY-MM-DD
    pub date: String,
    /// HH:MM
    pub time: String,
    pub price: f64,
    pub barber_name: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub status: String,
}

impl Appointment {
    pub fn status(&self) -> AppointmentStatus {
        match self.status.to_ascii_lowercase().as_str() {
            "confirmed" => AppointmentStatus::Confirmed,
            "completed" => AppointmentStatus::Completed,
            "cancelled" | "canceled" => AppointmentStatus::Cancelled,
            _ => AppointmentStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub done: bool,
}

impl Task {
    pub fn priority_level(&self) -> TaskPriority {
        TaskPriority::parse(&self.priority)
    }
}

fn default_priority() -> String {
    TaskPriority::Normal.as_str().to_string()
}

// ===== Request bodies =====

#[derive(Debug, Clone, Serialize)]
pub struct NewClient {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub client_id: String,
    pub client_name: String,
    pub service_id: String,
    pub service_name: String,
    pub date: String,
    pub time: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barber_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewAppointment {
    /// Build an appointment for `client` booking `service`, copying the
    /// denormalized names and price the API expects.
    pub fn for_client(client: &Client, service: &Service, date: &str, time: &str) -> Self {
        Self {
            client_id: client.id.clone(),
            client_name: client.name.clone(),
            service_id: service.id.clone(),
            service_name: service.name.clone(),
            date: date.to_string(),
            time: time.to_string(),
            price: service.price,
            barber_name: None,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTask {
    pub title: String,
    pub priority: String,
}

impl NewTask {
    pub fn new(title: impl Into<String>, priority: TaskPriority) -> Self {
        Self {
            title: title.into(),
            priority: priority.as_str().to_string(),
        }
    }
}
