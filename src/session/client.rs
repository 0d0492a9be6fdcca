use log::debug;
use serde::de::DeserializeOwned;

use crate::PitwallError;

use super::{
    CarSample, DriverInfo, IntervalSample, LapSample, LocationSample, PitSample, PositionSample,
    RaceControlMessage, SessionInfo, StintSample, TeamRadioSample, WeatherSample,
};

const OPENF1_BASE_URL: &str = "https://api.openf1.org/v1";

/// Thin client for the OpenF1 v1 REST API.
///
/// Every method is a one-shot fetch of a full, already-recorded channel;
/// there is no retry or backoff policy here. Callers decide how to schedule
/// and combine the requests.
pub struct OpenF1Client {
    base_url: String,
    http: reqwest::Client,
}

impl Default for OpenF1Client {
    fn default() -> Self {
        Self::new(OPENF1_BASE_URL)
    }
}

impl OpenF1Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    async fn fetch_array<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, PitwallError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| PitwallError::OpenF1RequestError { source: e })?;
        let rows: Vec<T> = response
            .json()
            .await
            .map_err(|e| PitwallError::OpenF1RequestError { source: e })?;
        debug!("GET {}: {} rows", path, rows.len());
        Ok(rows)
    }

    pub async fn session(&self, session_key: i32) -> Result<Option<SessionInfo>, PitwallError> {
        let sessions: Vec<SessionInfo> = self
            .fetch_array("sessions", &[("session_key", session_key.to_string())])
            .await?;
        Ok(sessions.into_iter().next())
    }

    pub async fn drivers(&self, session_key: i32) -> Result<Vec<DriverInfo>, PitwallError> {
        self.fetch_array("drivers", &[("session_key", session_key.to_string())])
            .await
    }

    pub async fn car_data(
        &self,
        session_key: i32,
        driver_number: i32,
    ) -> Result<Vec<CarSample>, PitwallError> {
        self.fetch_array(
            "car_data",
            &[
                ("session_key", session_key.to_string()),
                ("driver_number", driver_number.to_string()),
            ],
        )
        .await
    }

    pub async fn location(
        &self,
        session_key: i32,
        driver_number: i32,
    ) -> Result<Vec<LocationSample>, PitwallError> {
        self.fetch_array(
            "location",
            &[
                ("session_key", session_key.to_string()),
                ("driver_number", driver_number.to_string()),
            ],
        )
        .await
    }

    pub async fn positions(
        &self,
        session_key: i32,
        driver_number: i32,
    ) -> Result<Vec<PositionSample>, PitwallError> {
        self.fetch_array(
            "position",
            &[
                ("session_key", session_key.to_string()),
                ("driver_number", driver_number.to_string()),
            ],
        )
        .await
    }

    pub async fn laps(
        &self,
        session_key: i32,
        driver_number: i32,
    ) -> Result<Vec<LapSample>, PitwallError> {
        self.fetch_array(
            "laps",
            &[
                ("session_key", session_key.to_string()),
                ("driver_number", driver_number.to_string()),
            ],
        )
        .await
    }

    pub async fn stints(
        &self,
        session_key: i32,
        driver_number: i32,
    ) -> Result<Vec<StintSample>, PitwallError> {
        self.fetch_array(
            "stints",
            &[
                ("session_key", session_key.to_string()),
                ("driver_number", driver_number.to_string()),
            ],
        )
        .await
    }

    pub async fn pit_stops(
        &self,
        session_key: i32,
        driver_number: i32,
    ) -> Result<Vec<PitSample>, PitwallError> {
        self.fetch_array(
            "pit",
            &[
                ("session_key", session_key.to_string()),
                ("driver_number", driver_number.to_string()),
            ],
        )
        .await
    }

    pub async fn weather(&self, session_key: i32) -> Result<Vec<WeatherSample>, PitwallError> {
        self.fetch_array("weather", &[("session_key", session_key.to_string())])
            .await
    }

    pub async fn race_control(
        &self,
        session_key: i32,
    ) -> Result<Vec<RaceControlMessage>, PitwallError> {
        self.fetch_array("race_control", &[("session_key", session_key.to_string())])
            .await
    }

    pub async fn team_radio(
        &self,
        session_key: i32,
        driver_number: i32,
    ) -> Result<Vec<TeamRadioSample>, PitwallError> {
        self.fetch_array(
            "team_radio",
            &[
                ("session_key", session_key.to_string()),
                ("driver_number", driver_number.to_string()),
            ],
        )
        .await
    }

    pub async fn intervals(
        &self,
        session_key: i32,
        driver_number: i32,
    ) -> Result<Vec<IntervalSample>, PitwallError> {
        self.fetch_array(
            "intervals",
            &[
                ("session_key", session_key.to_string()),
                ("driver_number", driver_number.to_string()),
            ],
        )
        .await
    }
}
