//! Data models for NeoBarber entities.
//!
//! This module contains the wire types exchanged with the NeoBarber API:
//!
//! - `User`, `TokenResponse`: Account and authentication payloads
//! - `Service`, `Client`, `Appointment`, `Task`: Barbershop records
//! - `RevenueAnalytics`: Server-computed revenue summary for the dashboard

pub mod analytics;
pub mod shop;
pub mod user;

pub use analytics::{ChartPoint, RevenueAnalytics};
pub use shop::{
    Appointment, AppointmentStatus, Client, NewAppointment, NewClient, NewTask, Service, Task,
    TaskPriority,
};
pub use user::{LoginRequest, RegisterRequest, TokenResponse, User};
