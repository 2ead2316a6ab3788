//! Application state for the NeoBarber command-line front end.
//!
//! `App` owns the configuration and the `SessionStore`, restores the session
//! on launch and implements one method per subcommand.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{debug, info, warn};

use neobarber_core::models::{
    Appointment, AppointmentStatus, Client, NewAppointment, NewClient, NewTask, Service, TaskPriority,
};
use neobarber_core::utils::{format_currency, format_date, format_percent, format_phone, truncate_string};
use neobarber_core::{open_store, ApiClient, Config, Phase, SessionStore};

/// Environment variable holding the password for non-interactive use
const ENV_PASSWORD: &str = "NEOBARBER_PASSWORD";

/// Environment variable holding the login email
const ENV_EMAIL: &str = "NEOBARBER_EMAIL";

/// Maximum width for names in list output
const NAME_COLUMN_WIDTH: usize = 24;

/// Number of days shown in the revenue chart
const CHART_DAYS: usize = 7;

pub struct App {
    pub config: Config,
    pub session: SessionStore,
}

impl App {
    /// Create the application and restore any previous session
    pub async fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        debug!(api = %config.api_base_url, backend = %config.storage_backend, "Config loaded");

        let data_dir = config.data_dir().unwrap_or_else(|_| PathBuf::from("./data"));
        let storage = open_store(config.storage_backend, &data_dir);
        let api = ApiClient::new(config.api_base_url.clone(), config.request_timeout())
            .context("Failed to create API client")?;

        let session = SessionStore::new(api, storage);
        session.load_user().await;
        debug!(phase = ?session.phase(), "Session restored");

        Ok(Self { config, session })
    }

    /// API client for commands that need a logged-in user
    fn require_session(&self) -> Result<ApiClient> {
        match self.session.phase() {
            Phase::Authenticated => Ok(self.session.api()),
            Phase::Unauthenticated => Err(anyhow::anyhow!(
                "Not logged in. Run `neobarber login` first."
            )),
            Phase::Restoring => Err(anyhow::anyhow!("Session is still being restored")),
        }
    }

    fn read_password(prompt: &str) -> Result<String> {
        if let Ok(password) = std::env::var(ENV_PASSWORD) {
            return Ok(password);
        }
        let password = rpassword::prompt_password(prompt)?;
        Ok(password)
    }

    fn read_line(prompt: &str) -> Result<String> {
        print!("{}", prompt);
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email
            .or_else(|| std::env::var(ENV_EMAIL).ok())
            .or_else(|| self.config.last_email.clone())
        {
            Some(email) => email,
            None => Self::read_line("Email: ")?,
        };
        if email.is_empty() {
            return Err(anyhow::anyhow!("Email and password required"));
        }
        let password = Self::read_password("Password: ")?;
        if password.is_empty() {
            return Err(anyhow::anyhow!("Email and password required"));
        }

        self.session.login(&email, &password).await?;
        self.remember_email(email);
        self.print_greeting();
        Ok(())
    }

    pub async fn register(
        &mut self,
        email: String,
        name: String,
        organization: Option<String>,
    ) -> Result<()> {
        let password = Self::read_password("Choose a password: ")?;
        if password.is_empty() {
            return Err(anyhow::anyhow!("Password required"));
        }

        self.session
            .register(&email, &password, &name, organization.as_deref())
            .await?;
        self.remember_email(email);
        self.print_greeting();
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        self.session.logout().await;
        println!("Logged out.");
        Ok(())
    }

    pub fn whoami(&self) -> Result<()> {
        match self.session.user() {
            Some(user) => {
                println!("{} <{}>", user.name, user.email);
                if let Some(ref shop) = user.organization_name {
                    println!("Barbershop: {}", shop);
                }
                println!("API: {}", self.config.api_base_url);
            }
            None => println!("Not logged in."),
        }
        Ok(())
    }

    fn remember_email(&mut self, email: String) {
        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    fn print_greeting(&self) {
        if let Some(user) = self.session.user() {
            info!(user_id = %user.id, "Authenticated");
            println!("Welcome, {}!", user.display_name());
        }
    }

    // =========================================================================
    // Barbershop data
    // =========================================================================

    /// Show the confirmed appointments for `date` (today by default)
    pub async fn agenda(&self, date: Option<String>) -> Result<()> {
        let api = self.require_session()?;
        let date = date.unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());
        let agenda = api.fetch_agenda(&date).await.context("Failed to fetch agenda")?;

        println!("Agenda for {}", format_date(&agenda.date));
        if agenda.appointments.is_empty() {
            println!("  No appointments.");
        }
        for apt in &agenda.appointments {
            println!("  {}", appointment_line(apt));
        }
        println!(
            "{} clients, {} services available for booking",
            agenda.clients.len(),
            agenda.services.len()
        );
        Ok(())
    }

    pub async fn clients(&self) -> Result<()> {
        let api = self.require_session()?;
        let mut clients = api.fetch_clients().await.context("Failed to fetch clients")?;
        clients.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

        for client in &clients {
            let phone = client.phone.as_deref().map(format_phone).unwrap_or_default();
            println!(
                "{:<width$} {:<16} {} visits  {}",
                truncate_string(&client.name, NAME_COLUMN_WIDTH),
                phone,
                client.visits,
                format_currency(client.total_spent),
                width = NAME_COLUMN_WIDTH
            );
        }
        println!("{} clients", clients.len());
        Ok(())
    }

    pub async fn services(&self) -> Result<()> {
        let api = self.require_session()?;
        let services = api.fetch_services().await.context("Failed to fetch services")?;
        for service in &services {
            println!(
                "{:<width$} {:>12} {:>10}",
                truncate_string(&service.name, NAME_COLUMN_WIDTH),
                format_currency(service.price),
                service.duration,
                width = NAME_COLUMN_WIDTH
            );
        }
        Ok(())
    }

    pub async fn tasks(&self) -> Result<()> {
        let api = self.require_session()?;
        let mut tasks = api.fetch_tasks().await.context("Failed to fetch tasks")?;
        // Open tasks first, highest priority first
        tasks.sort_by(|a, b| {
            a.done
                .cmp(&b.done)
                .then_with(|| b.priority_level().cmp(&a.priority_level()))
        });

        for task in &tasks {
            let mark = if task.done { "x" } else { " " };
            let flag = if task.priority_level() == TaskPriority::High { "!" } else { "" };
            println!("[{}] {}{}", mark, task.title, flag);
        }
        let open = tasks.iter().filter(|t| !t.done).count();
        println!("{} open of {}", open, tasks.len());
        Ok(())
    }

    pub async fn revenue(&self, start: Option<String>, end: Option<String>) -> Result<()> {
        let api = self.require_session()?;
        let analytics = api
            .fetch_revenue(start.as_deref(), end.as_deref())
            .await
            .context("Failed to fetch revenue")?;

        println!("Revenue:       {}", format_currency(analytics.total_revenue));
        println!("Appointments:  {}", analytics.total_appointments);
        println!("Average ticket {}", format_currency(analytics.average_ticket));

        let recent = analytics.recent_points(CHART_DAYS);
        let peak = recent.iter().map(|p| p.revenue).fold(0.0_f64, f64::max);
        for point in recent {
            let share = if peak > 0.0 { point.revenue / peak } else { 0.0 };
            println!(
                "  {}  {:>12}  {:>6}",
                format_date(&point.date),
                format_currency(point.revenue),
                format_percent(share)
            );
        }
        Ok(())
    }

    /// Book `client` for `service` at `date` `time`. Both are matched by id
    /// or by case-insensitive name against the day's agenda.
    pub async fn book(&self, client: &str, service: &str, date: &str, time: &str) -> Result<()> {
        let api = self.require_session()?;
        let agenda = api.fetch_agenda(date).await.context("Failed to fetch agenda")?;
        let client = find_client(&agenda.clients, client)?;
        let service = find_service(&agenda.services, service)?;

        let booking = NewAppointment::for_client(client, service, date, time);
        let created = api
            .create_appointment(&booking)
            .await
            .context("Failed to book appointment")?;
        info!(appointment_id = %created.id, "Appointment booked");
        println!("Booked {}", appointment_line(&created));
        println!("id: {}", created.id);
        Ok(())
    }

    pub async fn complete(&self, id: &str) -> Result<()> {
        let api = self.require_session()?;
        let message = api
            .complete_appointment(id)
            .await
            .context("Failed to complete appointment")?;
        println!("{}", message);
        Ok(())
    }

    pub async fn cancel(&self, id: &str) -> Result<()> {
        let api = self.require_session()?;
        let message = api
            .delete_appointment(id)
            .await
            .context("Failed to cancel appointment")?;
        println!("{}", message);
        Ok(())
    }

    pub async fn add_client(
        &self,
        name: String,
        phone: Option<String>,
        email: Option<String>,
    ) -> Result<()> {
        let api = self.require_session()?;
        let client = NewClient {
            name,
            phone,
            email,
            notes: None,
        };
        let created = api.create_client(&client).await.context("Failed to add client")?;
        println!("Added {} (id: {})", created.name, created.id);
        Ok(())
    }

    pub async fn add_task(&self, title: String, priority: Option<String>) -> Result<()> {
        let api = self.require_session()?;
        let priority = priority
            .as_deref()
            .map(TaskPriority::parse)
            .unwrap_or(TaskPriority::Normal);
        let task = api
            .create_task(&NewTask::new(title, priority))
            .await
            .context("Failed to add task")?;
        println!("Added task {} (id: {})", task.title, task.id);
        Ok(())
    }

    pub async fn toggle_task(&self, id: &str) -> Result<()> {
        let api = self.require_session()?;
        let message = api.toggle_task(id).await.context("Failed to toggle task")?;
        println!("{}", message);
        Ok(())
    }

    pub async fn remove_task(&self, id: &str) -> Result<()> {
        let api = self.require_session()?;
        let message = api.delete_task(id).await.context("Failed to remove task")?;
        println!("{}", message);
        Ok(())
    }

    pub async fn health(&self) -> Result<()> {
        let healthy = self.session.api().health().await.context("Health check failed")?;
        println!(
            "{} is {}",
            self.config.api_base_url,
            if healthy { "healthy" } else { "unhealthy" }
        );
        Ok(())
    }
}

/// Pick the item whose id is `needle`, else the single one whose name
/// matches it ignoring case.
fn find_by_id_or_name<'a, T>(
    items: &'a [T],
    needle: &str,
    kind: &str,
    key: impl Fn(&T) -> (&str, &str),
) -> Result<&'a T> {
    if let Some(item) = items.iter().find(|item| key(item).0 == needle) {
        return Ok(item);
    }
    let wanted = needle.to_lowercase();
    let mut matches = items.iter().filter(|item| key(item).1.to_lowercase() == wanted);
    match (matches.next(), matches.next()) {
        (Some(item), None) => Ok(item),
        (Some(_), Some(_)) => Err(anyhow::anyhow!(
            "More than one {} named '{}', use the id instead",
            kind,
            needle
        )),
        (None, _) => Err(anyhow::anyhow!("No {} matching '{}'", kind, needle)),
    }
}

fn find_client<'a>(clients: &'a [Client], needle: &str) -> Result<&'a Client> {
    find_by_id_or_name(clients, needle, "client", |c| (c.id.as_str(), c.name.as_str()))
}

fn find_service<'a>(services: &'a [Service], needle: &str) -> Result<&'a Service> {
    find_by_id_or_name(services, needle, "service", |s| (s.id.as_str(), s.name.as_str()))
}

fn appointment_line(apt: &Appointment) -> String {
    let mut line = format!(
        "{}  {:<width$} {} - {}",
        apt.time,
        truncate_string(&apt.client_name, NAME_COLUMN_WIDTH),
        apt.service_name,
        format_currency(apt.price),
        width = NAME_COLUMN_WIDTH
    );
    if let Some(ref barber) = apt.barber_name {
        line.push_str(&format!(" ({})", barber));
    }
    if apt.status() != AppointmentStatus::Confirmed {
        line.push_str(&format!(" [{}]", apt.status()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appointment(status: &str, barber: Option<&str>) -> Appointment {
        Appointment {
            id: "a1".to_string(),
            client_id: "c1".to_string(),
            client_name: "Joao".to_string(),
            service_id: "s1".to_string(),
            service_name: "Cyber Fade".to_string(),
            date: "2024-05-01".to_string(),
            time: "14:30".to_string(),
            price: 65.0,
            barber_name: barber.map(str::to_string),
            notes: None,
            status: status.to_string(),
        }
    }

    fn client(id: &str, name: &str) -> Client {
        Client {
            id: id.to_string(),
            name: name.to_string(),
            phone: None,
            email: None,
            notes: None,
            visits: 0,
            total_spent: 0.0,
        }
    }

    fn service(id: &str, name: &str) -> Service {
        Service {
            id: id.to_string(),
            name: name.to_string(),
            price: 45.0,
            duration: "30 min".to_string(),
            description: None,
        }
    }

    #[test]
    fn test_find_client_by_id_or_name() {
        let clients = vec![client("c1", "Joao Silva"), client("c2", "Ana")];
        assert_eq!(find_client(&clients, "c2").unwrap().name, "Ana");
        assert_eq!(find_client(&clients, "joao silva").unwrap().id, "c1");
        assert!(find_client(&clients, "Pedro").is_err());
    }

    #[test]
    fn test_find_by_name_rejects_ambiguous_match() {
        let clients = vec![client("c1", "Ana"), client("c2", "ana")];
        let err = find_client(&clients, "ANA").unwrap_err();
        assert!(err.to_string().contains("More than one client"));
        // An exact id still resolves
        assert_eq!(find_client(&clients, "c2").unwrap().id, "c2");
    }

    #[test]
    fn test_find_service_prefers_id() {
        let services = vec![service("s1", "s2"), service("s2", "Cyber Fade")];
        assert_eq!(find_service(&services, "s2").unwrap().name, "Cyber Fade");
        assert_eq!(find_service(&services, "CYBER FADE").unwrap().id, "s2");
    }

    #[test]
    fn test_appointment_line_confirmed() {
        let line = appointment_line(&appointment("confirmed", None));
        assert!(line.starts_with("14:30  Joao"));
        assert!(line.ends_with("Cyber Fade - R$ 65.00"));
    }

    #[test]
    fn test_appointment_line_shows_barber_and_status() {
        let line = appointment_line(&appointment("completed", Some("Rafa")));
        assert!(line.contains("(Rafa)"));
        assert!(line.ends_with("[Completed]"));
    }
}
