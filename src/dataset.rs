use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::csv_reader::blank_as_none;
use crate::error::DashError;

/// One customer row of the telco churn export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "customerID")]
    pub customer_id: String,
    pub gender: String,
    #[serde(rename = "CitizensStatus")]
    pub citizens_status: String,
    #[serde(deserialize_with = "blank_as_none")]
    pub tenure: Option<f64>,
    #[serde(rename = "Contract")]
    pub contract: String,
    #[serde(rename = "TechSupport")]
    pub tech_support: String,
    #[serde(rename = "InternetService")]
    pub internet_service: String,
    #[serde(rename = "PaymentMethod")]
    pub payment_method: String,
    #[serde(rename = "MonthlyCharges", deserialize_with = "blank_as_none")]
    pub monthly_charges: Option<f64>,
    #[serde(rename = "TotalCharges", deserialize_with = "blank_as_none")]
    pub total_charges: Option<f64>,
    #[serde(rename = "Churn")]
    pub churn: String,
}

impl Record {
    /// Value of a raw categorical column. Blank cells count as missing.
    pub fn category(&self, dimension: Dimension) -> Option<&str> {
        let raw = match dimension {
            Dimension::Gender => &self.gender,
            Dimension::CitizensStatus => &self.citizens_status,
            Dimension::Contract => &self.contract,
            Dimension::TechSupport => &self.tech_support,
            Dimension::InternetService => &self.internet_service,
            Dimension::PaymentMethod => &self.payment_method,
            Dimension::Churn => &self.churn,
            _ => return None,
        };
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Value of a raw numeric column.
    pub fn number(&self, dimension: Dimension) -> Option<f64> {
        match dimension {
            Dimension::Tenure => self.tenure,
            Dimension::MonthlyCharges => self.monthly_charges,
            Dimension::TotalCharges => self.total_charges,
            _ => None,
        }
        .filter(|v| !v.is_nan())
    }

    /// Churn outcome as grouped on the `Churn` axis: trimmed, blank is missing.
    pub fn churn_outcome(&self) -> Option<&str> {
        self.category(Dimension::Churn)
    }

    pub fn churned(&self) -> bool {
        self.churn_outcome() == Some("Yes")
    }

    pub fn retained(&self) -> bool {
        self.churn_outcome() == Some("No")
    }
}

/// The loaded source table. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    origin: String,
    records: Vec<Record>,
}

impl Table {
    pub fn new(origin: &str, records: Vec<Record>) -> Self {
        Table {
            origin: origin.to_string(),
            records,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionKind {
    Categorical,
    Numeric,
    Bucketed,
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DimensionKind::Categorical => write!(f, "categorical"),
            DimensionKind::Numeric => write!(f, "numeric"),
            DimensionKind::Bucketed => write!(f, "bucketed"),
        }
    }
}

/// Every column a panel can group by or describe, raw or derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Dimension {
    Gender,
    CitizensStatus,
    Contract,
    TechSupport,
    InternetService,
    PaymentMethod,
    Churn,
    Tenure,
    MonthlyCharges,
    TotalCharges,
    ChurnBinary,
    ChargeRange,
    TotalChargeRange,
}

impl Dimension {
    pub const ALL: [Dimension; 13] = [
        Dimension::Gender,
        Dimension::CitizensStatus,
        Dimension::Contract,
        Dimension::TechSupport,
        Dimension::InternetService,
        Dimension::PaymentMethod,
        Dimension::Churn,
        Dimension::Tenure,
        Dimension::MonthlyCharges,
        Dimension::TotalCharges,
        Dimension::ChurnBinary,
        Dimension::ChargeRange,
        Dimension::TotalChargeRange,
    ];

    /// Column name as it appears in the source file.
    pub fn name(self) -> &'static str {
        match self {
            Dimension::Gender => "gender",
            Dimension::CitizensStatus => "CitizensStatus",
            Dimension::Contract => "Contract",
            Dimension::TechSupport => "TechSupport",
            Dimension::InternetService => "InternetService",
            Dimension::PaymentMethod => "PaymentMethod",
            Dimension::Churn => "Churn",
            Dimension::Tenure => "tenure",
            Dimension::MonthlyCharges => "MonthlyCharges",
            Dimension::TotalCharges => "TotalCharges",
            Dimension::ChurnBinary => "ChurnBinary",
            Dimension::ChargeRange => "ChargeRange",
            Dimension::TotalChargeRange => "TotalChargeRange",
        }
    }

    /// Human-readable title used by panels.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Gender => "Gender",
            Dimension::CitizensStatus => "Citizenship",
            Dimension::Contract => "Contract",
            Dimension::TechSupport => "Tech Support",
            Dimension::InternetService => "Internet Service",
            Dimension::PaymentMethod => "Payment Method",
            Dimension::Churn => "Churn",
            Dimension::Tenure => "Tenure",
            Dimension::MonthlyCharges => "Monthly Charges",
            Dimension::TotalCharges => "Total Charges",
            Dimension::ChurnBinary => "Churn Probability",
            Dimension::ChargeRange => "Monthly Charge Range",
            Dimension::TotalChargeRange => "Total Charge Range",
        }
    }

    pub fn kind(self) -> DimensionKind {
        match self {
            Dimension::Tenure
            | Dimension::MonthlyCharges
            | Dimension::TotalCharges
            | Dimension::ChurnBinary => DimensionKind::Numeric,
            Dimension::ChargeRange | Dimension::TotalChargeRange => DimensionKind::Bucketed,
            _ => DimensionKind::Categorical,
        }
    }

    /// Values known up front for a categorical column. Observed values outside
    /// this list are still grouped, after the declared ones.
    pub fn declared_domain(self) -> &'static [&'static str] {
        match self {
            Dimension::Gender => &["Female", "Male"],
            Dimension::Contract => &["Month-to-month", "One year", "Two year"],
            Dimension::TechSupport => &["No", "No internet service", "Yes"],
            Dimension::InternetService => &["DSL", "Fiber optic", "No"],
            Dimension::PaymentMethod => &[
                "Bank transfer (automatic)",
                "Credit card (automatic)",
                "Electronic check",
                "Mailed check",
            ],
            Dimension::Churn => &["No", "Yes"],
            _ => &[],
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dimension {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::ALL
            .into_iter()
            .find(|d| d.name() == s.trim())
            .ok_or_else(|| DashError::UnknownDimension(s.to_string()))
    }
}

impl TryFrom<String> for Dimension {
    type Error = DashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Dimension> for &'static str {
    fn from(value: Dimension) -> Self {
        value.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_names_round_trip() {
        for dimension in Dimension::ALL {
            assert_eq!(dimension.name().parse::<Dimension>(), Ok(dimension));
        }
        assert_eq!(
            "Partner".parse::<Dimension>(),
            Err(DashError::UnknownDimension("Partner".into()))
        );
    }

    #[test]
    fn dimensions_deserialize_from_column_names() {
        let dims: Vec<Dimension> = serde_json::from_str(r#"["tenure", "ChargeRange"]"#).unwrap();
        assert_eq!(dims, vec![Dimension::Tenure, Dimension::ChargeRange]);
        assert!(serde_json::from_str::<Dimension>(r#""Partner""#).is_err());
    }

    #[test]
    fn type_mismatch_messages_name_the_expected_kind() {
        let err = DashError::TypeMismatch {
            dimension: Dimension::Contract.name(),
            expected: DimensionKind::Numeric,
        };
        assert_eq!(err.to_string(), "dimension `Contract` is not numeric");
        assert_eq!(DimensionKind::Bucketed.to_string(), "bucketed");
    }

    #[test]
    fn blank_categories_are_missing() {
        let record = Record {
            gender: "  ".into(),
            contract: "One year".into(),
            ..Record::default()
        };
        assert_eq!(record.category(Dimension::Gender), None);
        assert_eq!(record.category(Dimension::Contract), Some("One year"));
        assert_eq!(record.category(Dimension::Tenure), None);
    }
}
