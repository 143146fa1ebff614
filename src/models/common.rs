use serde::Deserialize;

// Query parameters for the availability endpoint
#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    pub date: String,
    pub duration_minutes: Option<u32>,
}

// Query parameters for the management appointment listing
#[derive(Debug, Deserialize)]
pub struct AppointmentListParams {
    pub date: Option<String>,
}
