use chrono::NaiveDateTime;

/// One detected low-pressure center within a single time step.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub time: NaiveDateTime,
    pub lon: f64,
    pub lat: f64,
    /// Pressure at the candidate's grid cell, hPa.
    pub act_cen_pres: f64,
    /// Ocean-only mean pressure over the ASL box for this time step, hPa.
    pub sector_pres: Option<f64>,
    /// ActCenPres - SectorPres (Hosking et al. 2013).
    pub rel_cen_pres: Option<f64>,
}

impl Candidate {
    pub fn new(
        time: NaiveDateTime,
        lon: f64,
        lat: f64,
        act_cen_pres: f64,
        sector_pres: Option<f64>,
    ) -> Self {
        Candidate {
            time,
            lon,
            lat,
            act_cen_pres,
            sector_pres,
            rel_cen_pres: sector_pres.map(|s| act_cen_pres - s),
        }
    }
}

/// One index row per time step. Payload fields are `None` when no candidate
/// inside the ASL box survived for that step.
#[derive(Debug, Clone, PartialEq)]
pub struct AslRow {
    pub time: NaiveDateTime,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    pub act_cen_pres: Option<f64>,
    pub sector_pres: Option<f64>,
    pub rel_cen_pres: Option<f64>,
}

impl AslRow {
    pub fn placeholder(time: NaiveDateTime) -> Self {
        AslRow {
            time,
            lon: None,
            lat: None,
            act_cen_pres: None,
            sector_pres: None,
            rel_cen_pres: None,
        }
    }

    pub fn from_candidate(candidate: &Candidate) -> Self {
        AslRow {
            time: candidate.time,
            lon: Some(candidate.lon),
            lat: Some(candidate.lat),
            act_cen_pres: Some(candidate.act_cen_pres),
            sector_pres: candidate.sector_pres,
            rel_cen_pres: candidate.rel_cen_pres,
        }
    }
}
