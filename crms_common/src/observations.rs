//! Retrieval and storage commands for 2-D observation sets, and their responses.
//!
//! Commands are built incrementally by the caller and submitted by reference,
//! so a submitted command is never changed by the gateway. Only local shape
//! problems are reported as errors (`validate`); everything the external
//! system decides comes back through the response status fields.
use bincode::{Decode, Encode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::GatewayError;
use crate::grid::ValueGrid;
use crate::layout::{AxisSet, Observations2DLayout};
use crate::result::Result;

/// Date format used by the external system for date ranges.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Read query over subjects, data types, publishers and observed periods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieveObservations2DCommand {
    /// Subject codes, in request order. Duplicates are passed through.
    pub subjects: Vec<String>,
    /// Data type names, in request order.
    pub data_types: Vec<String>,
    /// Publisher codes, in request order.
    pub publishers: Vec<String>,
    /// Observed period tokens, in request order.
    pub observed_periods: Vec<String>,
    /// Opaque date range, e.g. `01/01/2018`.
    pub date_range: Option<String>,
    /// Grid layout of the response.
    pub layout: Observations2DLayout,
    /// Swap rows and columns of the response grid.
    pub transpose_view: bool,
}

/// Write command carrying a value grid for the requested axes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreObservations2DCommand {
    /// Subject codes, in request order.
    pub subjects: Vec<String>,
    /// Data type names, in request order.
    pub data_types: Vec<String>,
    /// Publisher codes, in request order.
    pub publishers: Vec<String>,
    /// Observed period tokens, in request order.
    pub observed_periods: Vec<String>,
    /// ISO currency code of the values, e.g. `AUD`.
    pub currency: Option<String>,
    /// Grid layout of `values`.
    pub layout: Observations2DLayout,
    /// `values` is laid out transposed.
    pub transpose_view: bool,
    /// Data body without header row or column.
    pub values: ValueGrid,
}

/// Axis entries, layout and orientation applied to a command in one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisSelection {
    /// Subject codes.
    pub subjects: Vec<String>,
    /// Data type names.
    pub data_types: Vec<String>,
    /// Publisher codes.
    pub publishers: Vec<String>,
    /// Observed period tokens.
    pub observed_periods: Vec<String>,
    /// Grid layout.
    pub layout: Observations2DLayout,
    /// Swap rows and columns.
    pub transpose_view: bool,
}

macro_rules! axis_builders {
    ($command:ty) => {
        impl $command {
            /// Append a subject code.
            pub fn add_subject(&mut self, subject: impl Into<String>) -> &mut Self {
                self.subjects.push(subject.into());
                self
            }

            /// Append a data type name.
            pub fn add_data_type(&mut self, data_type: impl Into<String>) -> &mut Self {
                self.data_types.push(data_type.into());
                self
            }

            /// Append a publisher code.
            pub fn add_publisher(&mut self, publisher: impl Into<String>) -> &mut Self {
                self.publishers.push(publisher.into());
                self
            }

            /// Append an observed period token.
            pub fn add_observed_period(&mut self, period: impl Into<String>) -> &mut Self {
                self.observed_periods.push(period.into());
                self
            }

            /// Select the grid layout.
            pub fn set_layout(&mut self, layout: Observations2DLayout) -> &mut Self {
                self.layout = layout;
                self
            }

            /// Swap rows and columns.
            pub fn set_transpose_view(&mut self, transpose: bool) -> &mut Self {
                self.transpose_view = transpose;
                self
            }

            /// Append the entries of `selection` and take over its layout and orientation.
            pub fn select_axes(&mut self, selection: AxisSelection) -> &mut Self {
                self.subjects.extend(selection.subjects);
                self.data_types.extend(selection.data_types);
                self.publishers.extend(selection.publishers);
                self.observed_periods.extend(selection.observed_periods);
                self.layout = selection.layout;
                self.transpose_view = selection.transpose_view;
                self
            }

            /// Borrow the four axes of the command.
            pub fn axes(&self) -> AxisSet<'_> {
                AxisSet {
                    subjects: &self.subjects,
                    data_types: &self.data_types,
                    publishers: &self.publishers,
                    observed_periods: &self.observed_periods,
                }
            }

            fn validate_axes(&self) -> Result<()> {
                require_entries("subject", &self.subjects)?;
                require_entries("data type", &self.data_types)?;
                require_non_blank("publisher", &self.publishers)?;
                require_non_blank("observed period", &self.observed_periods)
            }
        }
    };
}

axis_builders!(RetrieveObservations2DCommand);
axis_builders!(StoreObservations2DCommand);

impl RetrieveObservations2DCommand {
    /// Empty command with the default layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the opaque date range string.
    pub fn set_date_range(&mut self, range: impl Into<String>) -> &mut Self {
        self.date_range = Some(range.into());
        self
    }

    /// Set the date range from calendar dates (`dd/mm/yyyy` or `dd/mm/yyyy-dd/mm/yyyy`).
    pub fn set_date_range_dates(&mut self, from: NaiveDate, to: Option<NaiveDate>) -> &mut Self {
        self.date_range = Some(format_date_range(from, to));
        self
    }

    /// Check the command is well formed before submission.
    pub fn validate(&self) -> Result<()> {
        self.validate_axes()?;
        if let Some(range) = &self.date_range {
            if range.trim().is_empty() {
                return Err(GatewayError::InvalidCommand(String::from(
                    "date range must not be blank when set",
                )));
            }
        }
        Ok(())
    }
}

impl StoreObservations2DCommand {
    /// Empty command with the default layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the currency code of the stored values.
    pub fn set_currency(&mut self, currency: impl Into<String>) -> &mut Self {
        self.currency = Some(currency.into());
        self
    }

    /// Replace the value grid.
    pub fn set_values(&mut self, values: ValueGrid) -> &mut Self {
        self.values = values;
        self
    }

    /// Replace the value grid from raw rows, rejecting ragged input.
    pub fn set_value_rows(&mut self, rows: Vec<Vec<String>>) -> Result<&mut Self> {
        self.values = ValueGrid::from_rows(rows)?;
        Ok(self)
    }

    /// `(rows, columns)` the value grid must have for the current axes and layout.
    pub fn expected_shape(&self) -> (usize, usize) {
        self.axes().expected_shape(self.layout, self.transpose_view)
    }

    /// Check the command is well formed before submission.
    pub fn validate(&self) -> Result<()> {
        self.validate_axes()?;

        if let Some(currency) = &self.currency {
            let valid = currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase());
            if !valid {
                return Err(GatewayError::InvalidCommand(format!(
                    "currency '{}' is not a three letter ISO code",
                    currency
                )));
            }
        }

        if self.values.is_empty() {
            return Err(GatewayError::InvalidGrid(String::from(
                "store command carries no values",
            )));
        }

        let expected = self.expected_shape();
        if self.values.shape() != expected || self.values.cell_count() != expected.0 * expected.1 {
            return Err(GatewayError::InvalidGrid(format!(
                "value grid is {}x{} but layout {} expects {}x{}",
                self.values.rows(),
                self.values.columns(),
                self.layout,
                expected.0,
                expected.1
            )));
        }
        Ok(())
    }
}

fn require_entries(axis: &str, values: &[String]) -> Result<()> {
    if values.is_empty() {
        return Err(GatewayError::InvalidCommand(format!(
            "at least one {} is required",
            axis
        )));
    }
    require_non_blank(axis, values)
}

fn require_non_blank(axis: &str, values: &[String]) -> Result<()> {
    if let Some(index) = values.iter().position(|v| v.trim().is_empty()) {
        return Err(GatewayError::InvalidCommand(format!(
            "{} #{} is blank",
            axis, index
        )));
    }
    Ok(())
}

/// Format calendar dates into the external date range syntax.
pub fn format_date_range(from: NaiveDate, to: Option<NaiveDate>) -> String {
    match to {
        Some(to) => format!("{}-{}", from.format(DATE_FORMAT), to.format(DATE_FORMAT)),
        None => from.format(DATE_FORMAT).to_string(),
    }
}

/// Availability class of a retrieval.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode, Serialize, Deserialize, Display, EnumString,
)]
#[non_exhaustive]
pub enum RetrieveResponseStatus {
    /// Values were found and returned.
    Available,
    /// The query was understood but nothing is held for it.
    NotAvailable,
    /// The query could not be processed (unknown subject, transport failure, ...).
    SystemError,
    /// The session is not allowed to read.
    AccessDenied,
}

/// Result of a retrieval: status plus a header-annotated grid.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct RetrieveObservations2DResponse {
    /// Availability class.
    pub status: RetrieveResponseStatus,
    /// Header-annotated value grid; unspecified unless `status` is `Available`.
    #[serde(default)]
    pub values: ValueGrid,
    /// Diagnostic text accompanying non-available statuses.
    #[serde(default)]
    pub message: Option<String>,
}

impl RetrieveObservations2DResponse {
    /// Successful response carrying `values`.
    pub fn available(values: ValueGrid) -> Self {
        Self {
            status: RetrieveResponseStatus::Available,
            values,
            message: None,
        }
    }

    /// Response without values.
    pub fn with_status(status: RetrieveResponseStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            values: ValueGrid::empty(),
            message: Some(message.into()),
        }
    }

    /// `true` when the status is `Available`.
    pub fn is_available(&self) -> bool {
        self.status == RetrieveResponseStatus::Available
    }

    /// Body cell addressed by its row and column labels.
    pub fn value(&self, row_header: &str, column_header: &str) -> Option<&str> {
        self.values.lookup(row_header, column_header)
    }

    /// `true` when the header row and column are the labels `command` asks for.
    pub fn matches_axes(&self, command: &RetrieveObservations2DCommand) -> bool {
        let axes = command.axes();
        let rows = axes.expected_row_labels(command.layout, command.transpose_view);
        let columns = axes.expected_column_labels(command.layout, command.transpose_view);
        self.values.row_headers() == rows && self.values.column_headers() == columns
    }
}

/// A single rejected cell of a store command.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct CellError {
    /// Zero-based row in the submitted value grid.
    pub row: u32,
    /// Zero-based column in the submitted value grid.
    pub column: u32,
    /// Why the cell was rejected.
    pub reason: String,
}

/// Result of a store: aggregate error count plus per-cell detail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct StoreObservations2DResponse {
    /// Number of errors encountered during the write; zero means fully stored.
    pub errors_total: u32,
    /// Per-cell detail, when the system reports it.
    #[serde(default)]
    pub errors: Vec<CellError>,
    /// Diagnostic text for whole-command failures.
    #[serde(default)]
    pub message: Option<String>,
}

impl StoreObservations2DResponse {
    /// Fully successful store.
    pub fn stored() -> Self {
        Self::default()
    }

    /// Build a response from per-cell errors.
    pub fn from_cell_errors(errors: Vec<CellError>) -> Self {
        Self {
            errors_total: u32::try_from(errors.len()).unwrap_or(u32::MAX),
            errors,
            message: None,
        }
    }

    /// Whole-command failure counting `errors_total` errors.
    pub fn failed(errors_total: u32, message: impl Into<String>) -> Self {
        Self {
            errors_total: errors_total.max(1),
            errors: Vec::new(),
            message: Some(message.into()),
        }
    }

    /// `true` when nothing was rejected.
    pub fn is_success(&self) -> bool {
        self.errors_total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn financial_statement_query() -> RetrieveObservations2DCommand {
        let mut command = RetrieveObservations2DCommand::new();
        command.add_subject("BHP").add_publisher("JPM");
        for data_type in ["SALES", "EBIT_REP", "BROKER_NPAT"] {
            command.add_data_type(data_type);
        }
        for period in ["2018", "2019", "2020"] {
            command.add_observed_period(period);
        }
        command
            .set_layout(Observations2DLayout::DatatypesByFinYearsAndPublishers)
            .set_transpose_view(true);
        command
    }

    #[test]
    fn axis_selection_fills_either_command_the_same_way() {
        let selection = AxisSelection {
            subjects: vec![String::from("BHP")],
            data_types: vec![String::from("SALES"), String::from("EBIT_REP"), String::from("BROKER_NPAT")],
            publishers: vec![String::from("JPM")],
            observed_periods: vec![String::from("2018"), String::from("2019"), String::from("2020")],
            layout: Observations2DLayout::DatatypesByFinYearsAndPublishers,
            transpose_view: true,
        };

        let mut retrieve = RetrieveObservations2DCommand::new();
        retrieve.select_axes(selection.clone());
        assert_eq!(retrieve, financial_statement_query());

        let mut store = StoreObservations2DCommand::new();
        store.select_axes(selection);
        assert_eq!(store.axes().subjects, retrieve.axes().subjects);
        assert_eq!(store.expected_shape(), (3, 3));
    }

    #[test]
    fn retrieve_requires_subject_and_data_type() {
        let mut command = RetrieveObservations2DCommand::new();
        assert!(matches!(command.validate(), Err(GatewayError::InvalidCommand(_))));

        command.add_subject("BHP");
        assert!(command.validate().is_err());

        command.add_data_type("CLOSE PRICE").set_date_range("01/01/2018");
        assert!(command.validate().is_ok());
    }

    #[test]
    fn blank_entries_are_rejected() {
        let mut command = RetrieveObservations2DCommand::new();
        command.add_subject("BHP").add_data_type("CLOSE PRICE").add_publisher("  ");
        let err = command.validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid command: publisher #0 is blank");
    }

    #[test]
    fn duplicate_subjects_are_kept_in_order() {
        let mut command = RetrieveObservations2DCommand::new();
        command.add_subject("BHP").add_subject("NAB").add_subject("BHP");
        assert_eq!(command.subjects, vec!["BHP", "NAB", "BHP"]);
    }

    #[test]
    fn date_range_from_calendar_dates() {
        let from = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2018, 12, 31).unwrap();
        let mut command = RetrieveObservations2DCommand::new();

        command.set_date_range_dates(from, None);
        assert_eq!(command.date_range.as_deref(), Some("01/01/2018"));

        command.set_date_range_dates(from, Some(to));
        assert_eq!(command.date_range.as_deref(), Some("01/01/2018-31/12/2018"));
    }

    #[test]
    fn response_headers_are_matched_against_the_query() {
        let command = financial_statement_query();
        let values = ValueGrid::from_str_rows([
            ["", "2018 JPM", "2019 JPM", "2020 JPM"],
            ["SALES", "45809000000", "45139000000", "43952834224.06"],
            ["EBIT_REP", "16169000000", "15712000000", "16594015907.75"],
            ["BROKER_NPAT", "8933000000", "9466000000", "10540132135.14"],
        ])
        .unwrap();
        let response = RetrieveObservations2DResponse::available(values);

        assert!(response.matches_axes(&command));
        assert_eq!(response.value("EBIT_REP", "2019 JPM"), Some("15712000000"));

        let mut untransposed = command.clone();
        untransposed.set_transpose_view(false);
        assert!(!response.matches_axes(&untransposed));
    }

    #[test]
    fn store_grid_must_match_layout_shape() {
        let mut command = StoreObservations2DCommand::new();
        command
            .set_layout(Observations2DLayout::DatatypesBySubjects)
            .add_subject("BHP")
            .add_publisher("GAMMA")
            .add_data_type("EPS")
            .add_data_type("DPS")
            .add_observed_period("2018")
            .set_currency("USD");
        command
            .set_value_rows(vec![vec![String::from("1.10"), String::from(".03")]])
            .unwrap();
        assert_eq!(command.expected_shape(), (1, 2));
        assert!(command.validate().is_ok());

        command.set_transpose_view(true);
        assert!(matches!(command.validate(), Err(GatewayError::InvalidGrid(_))));
    }

    #[test]
    fn store_rejects_bad_currency_and_empty_values() {
        let mut command = StoreObservations2DCommand::new();
        command.add_subject("BHP").add_data_type("CLOSE PRICE");
        assert!(matches!(command.validate(), Err(GatewayError::InvalidGrid(_))));

        command.set_values(ValueGrid::from_str_rows([["45"]]).unwrap());
        command.set_currency("aud");
        assert!(matches!(command.validate(), Err(GatewayError::InvalidCommand(_))));

        command.set_currency("AUD");
        assert!(command.validate().is_ok());
    }

    #[test]
    fn store_response_counts_cell_errors() {
        let response = StoreObservations2DResponse::from_cell_errors(vec![CellError {
            row: 1,
            column: 0,
            reason: String::from("unknown subject 'XYZ'"),
        }]);
        assert_eq!(response.errors_total, 1);
        assert!(!response.is_success());
        assert!(StoreObservations2DResponse::stored().is_success());
        assert_eq!(StoreObservations2DResponse::failed(0, "down").errors_total, 1);
    }
}
