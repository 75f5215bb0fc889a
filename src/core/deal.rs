//! Deal records and the drafts used to create or change them

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Lifecycle stage of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Negotiation,
    Won,
    Lost,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Stage::Negotiation => "negotiation",
                Stage::Won => "won",
                Stage::Lost => "lost",
            }
        )
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "negotiation" => Ok(Stage::Negotiation),
            "won" => Ok(Stage::Won),
            "lost" => Ok(Stage::Lost),
            _ => Err(anyhow!("Invalid stage: {}", s)),
        }
    }
}

/// A sales opportunity as stored in the remote `deals` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub company: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    pub deal_date: NaiveDate,
    pub owner: String,
    #[serde(default)]
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a user fills in to create a deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealDraft {
    pub name: String,
    pub company: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    pub deal_date: NaiveDate,
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

impl DealDraft {
    /// Stamps the draft with its owning user, resolving the default stage.
    pub fn into_new_deal(self, user_id: &str) -> NewDeal {
        NewDeal {
            user_id: user_id.to_string(),
            name: self.name,
            company: self.company,
            amount: self.amount,
            deal_date: self.deal_date,
            owner: self.owner,
            stage: self.stage.unwrap_or_default(),
        }
    }
}

/// The row sent to the store on insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDeal {
    pub user_id: String,
    pub name: String,
    pub company: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    pub deal_date: NaiveDate,
    pub owner: String,
    pub stage: Stage,
}

/// A partial set of field changes. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DealPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::arbitrary_precision_option"
    )]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

impl DealPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.company.is_none()
            && self.amount.is_none()
            && self.deal_date.is_none()
            && self.owner.is_none()
            && self.stage.is_none()
    }

    /// Returns a copy of `deal` with the present fields replaced.
    /// `id`, `user_id` and the timestamps are never touched.
    pub fn apply_to(&self, deal: &Deal) -> Deal {
        let mut updated = deal.clone();
        if let Some(name) = &self.name {
            updated.name = name.clone();
        }
        if let Some(company) = &self.company {
            updated.company = company.clone();
        }
        if let Some(amount) = self.amount {
            updated.amount = amount;
        }
        if let Some(deal_date) = self.deal_date {
            updated.deal_date = deal_date;
        }
        if let Some(owner) = &self.owner {
            updated.owner = owner.clone();
        }
        if let Some(stage) = self.stage {
            updated.stage = stage;
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_deal() -> Deal {
        let ts = DateTime::parse_from_rfc3339("2024-01-15T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Deal {
            id: "d-1".to_string(),
            user_id: "u-1".to_string(),
            name: "Enterprise Plan".to_string(),
            company: "Amazon.com".to_string(),
            amount: Decimal::from(125000),
            deal_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            owner: "Ana".to_string(),
            stage: Stage::Won,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_stage_parse_and_display() {
        assert_eq!("WON".parse::<Stage>().unwrap(), Stage::Won);
        assert_eq!("negotiation".parse::<Stage>().unwrap(), Stage::Negotiation);
        assert!("pending".parse::<Stage>().is_err());
        assert_eq!(Stage::Lost.to_string(), "lost");
        assert_eq!(Stage::default(), Stage::Negotiation);
    }

    #[test]
    fn test_deal_deserialization() {
        let json = r#"{
            "id": "9b2f",
            "user_id": "u-1",
            "name": "Cloud Migration",
            "company": "Globex",
            "amount": 45000.5,
            "deal_date": "2024-02-01",
            "owner": "Luis",
            "stage": "negotiation",
            "created_at": "2024-02-01T08:30:00+00:00",
            "updated_at": "2024-02-01T08:30:00+00:00"
        }"#;

        let deal: Deal = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(deal.id, "9b2f");
        assert_eq!(deal.amount, Decimal::new(450005, 1));
        assert_eq!(deal.deal_date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(deal.stage, Stage::Negotiation);
    }

    #[test]
    fn test_draft_defaults_to_negotiation() {
        let draft = DealDraft {
            name: "Support".to_string(),
            company: "Initech".to_string(),
            amount: Decimal::from(1000),
            deal_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            owner: "Ana".to_string(),
            stage: None,
        };

        let row = draft.into_new_deal("u-7");
        assert_eq!(row.user_id, "u-7");
        assert_eq!(row.stage, Stage::Negotiation);

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["stage"], "negotiation");
        assert_eq!(value["amount"], 1000);
        assert_eq!(value["deal_date"], "2024-03-01");
    }

    #[test]
    fn test_amount_keeps_full_precision() {
        let json = r#"{
            "name": "Fleet Renewal",
            "company": "Acme",
            "amount": 12345678901234567.89,
            "deal_date": "2024-01-01",
            "owner": "Ana"
        }"#;

        let draft: DealDraft = serde_json::from_str(json).expect("Failed to deserialize");
        let exact: Decimal = "12345678901234567.89".parse().unwrap();
        assert_eq!(draft.amount, exact);

        let row = serde_json::to_string(&draft.into_new_deal("u-1")).unwrap();
        assert!(row.contains(r#""amount":12345678901234567.89"#), "{row}");

        let patch = DealPatch {
            amount: Some(Decimal::new(10, 2)),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"amount":0.10}"#);
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let patch = DealPatch {
            stage: Some(Stage::Won),
            ..Default::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, serde_json::json!({ "stage": "won" }));
        assert!(!patch.is_empty());
        assert!(DealPatch::default().is_empty());
    }

    #[test]
    fn test_patch_apply_keeps_other_fields() {
        let deal = sample_deal();
        let patch = DealPatch {
            amount: Some(Decimal::from(130000)),
            owner: Some("Marta".to_string()),
            ..Default::default()
        };

        let updated = patch.apply_to(&deal);
        assert_eq!(updated.amount, Decimal::from(130000));
        assert_eq!(updated.owner, "Marta");
        assert_eq!(updated.id, deal.id);
        assert_eq!(updated.user_id, deal.user_id);
        assert_eq!(updated.name, deal.name);
        assert_eq!(updated.company, deal.company);
        assert_eq!(updated.deal_date, deal.deal_date);
        assert_eq!(updated.stage, deal.stage);
        assert_eq!(updated.created_at, deal.created_at);
    }
}
