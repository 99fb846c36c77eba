/// Human readable UTC date time
pub struct DateTime(chrono::DateTime<chrono::Utc>);

impl DateTime {
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    pub fn fmt_to_ms(&self) -> String {
        self.0.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }
}
