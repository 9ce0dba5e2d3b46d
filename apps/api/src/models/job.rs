use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where the work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    Remote,
    Hybrid,
    Onsite,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Remote => "remote",
            LocationType::Hybrid => "hybrid",
            LocationType::Onsite => "onsite",
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLocationTypeError(pub String);

impl fmt::Display for ParseLocationTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is not a location type (expected remote, hybrid or onsite)",
            self.0
        )
    }
}

impl std::error::Error for ParseLocationTypeError {}

impl FromStr for LocationType {
    type Err = ParseLocationTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote" => Ok(LocationType::Remote),
            "hybrid" => Ok(LocationType::Hybrid),
            "onsite" | "on-site" | "on site" | "in office" | "in-office" | "office" => {
                Ok(LocationType::Onsite)
            }
            _ => Err(ParseLocationTypeError(s.to_string())),
        }
    }
}

/// A job vacancy. Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub company: String,
    pub description: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    pub location_type: LocationType,
    #[serde(default)]
    pub location: Option<String>,
    pub salary_min: u64,
    pub salary_max: u64,
    pub industry: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub min_years_experience: u32,
}

impl JobPosting {
    /// "$60,000 - $80,000"
    pub fn salary_range(&self) -> String {
        format!(
            "{} - {}",
            format_usd(self.salary_min),
            format_usd(self.salary_max)
        )
    }

    /// Text submitted to the embedding collaborator for this posting.
    pub fn to_embedding_text(&self) -> String {
        let skills: Vec<&str> = self
            .required_skills
            .iter()
            .chain(self.preferred_skills.iter())
            .map(String::as_str)
            .collect();
        let location = match &self.location {
            Some(place) => format!("{} - {}", self.location_type, place),
            None => self.location_type.to_string(),
        };

        format!(
            "Job Title: {}\nCompany: {}\nDescription: {}\nSkills: {}\nLocation: {}\nSalary Range: {}\nIndustry: {}",
            self.title,
            self.company,
            self.description,
            skills.join(", "),
            location,
            self.salary_range(),
            self.industry
        )
    }
}

/// Formats a whole-dollar amount with thousands separators: `20000` → `$20,000`.
pub fn format_usd(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("${out}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_usd_inserts_separators() {
        assert_eq!(format_usd(0), "$0");
        assert_eq!(format_usd(950), "$950");
        assert_eq!(format_usd(20000), "$20,000");
        assert_eq!(format_usd(1250000), "$1,250,000");
    }

    #[test]
    fn test_location_type_parses_aliases() {
        assert_eq!("Remote".parse::<LocationType>(), Ok(LocationType::Remote));
        assert_eq!("on-site".parse::<LocationType>(), Ok(LocationType::Onsite));
        assert_eq!("in office".parse::<LocationType>(), Ok(LocationType::Onsite));
        assert!("anywhere".parse::<LocationType>().is_err());
    }

    #[test]
    fn test_location_type_serde_lowercase() {
        let json = serde_json::to_string(&LocationType::Hybrid).unwrap();
        assert_eq!(json, r#""hybrid""#);
        let parsed: LocationType = serde_json::from_str(r#""onsite""#).unwrap();
        assert_eq!(parsed, LocationType::Onsite);
    }

    #[test]
    fn test_job_posting_defaults_optional_fields() {
        let json = r#"{
            "id": "job-1",
            "title": "Delivery Driver",
            "description": "Deliver parcels",
            "location_type": "onsite",
            "salary_min": 30000,
            "salary_max": 42000,
            "industry": "Logistics"
        }"#;
        let job: JobPosting = serde_json::from_str(json).unwrap();
        assert!(job.required_skills.is_empty());
        assert_eq!(job.min_years_experience, 0);
        assert_eq!(job.salary_range(), "$30,000 - $42,000");
    }
}
