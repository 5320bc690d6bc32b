//! Layouts that flatten multi-axis observation sets into 2-D grids.
//!
//! An observation is keyed by subject, data type, publisher and observed
//! period. A layout names which of those axes run across the columns and
//! which run down the rows: "X by Y" puts X across the columns and Y down the
//! rows. When several axes share one side their entries are combined as a
//! cartesian product in axis order and the label tokens are joined with a
//! single space, so periods `2018, 2019` with publisher `JPM` give the column
//! labels `2018 JPM` and `2019 JPM`.
//!
//! An axis the caller left empty counts as a single implicit entry and
//! contributes no label token.
use bincode::{Decode, Encode};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// One dimension of an observation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Security or entity code, e.g. `BHP`.
    Subject,
    /// Measure name, e.g. `CLOSE PRICE`.
    DataType,
    /// Source of the figure, e.g. a broker code.
    Publisher,
    /// Financial year or other period token, e.g. `2018`.
    ObservedPeriod,
}

/// Grid layout understood by the external system.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    Deserialize,
    Encode,
    Decode,
    ValueEnum,
    Display,
    EnumString,
    Hash,
    Eq,
    PartialEq,
)]
#[non_exhaustive]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
#[value(rename_all = "camelCase")]
pub enum Observations2DLayout {
    /// Data types across, subjects down.
    #[default]
    DatatypesBySubjects,
    /// Subjects across, data types down.
    SubjectsByDatatypes,
    /// Data types across, observed periods down.
    DatatypesByFinYears,
    /// Data types across, publishers down.
    DatatypesByPublishers,
    /// Data types across, observed period and publisher pairs down.
    DatatypesByFinYearsAndPublishers,
}

impl Observations2DLayout {
    /// Axes that run across the columns, outermost first.
    pub const fn column_axes(self) -> &'static [Axis] {
        match self {
            Self::DatatypesBySubjects
            | Self::DatatypesByFinYears
            | Self::DatatypesByPublishers
            | Self::DatatypesByFinYearsAndPublishers => &[Axis::DataType],
            Self::SubjectsByDatatypes => &[Axis::Subject],
        }
    }

    /// Axes that run down the rows, outermost first.
    pub const fn row_axes(self) -> &'static [Axis] {
        match self {
            Self::DatatypesBySubjects => &[Axis::Subject],
            Self::SubjectsByDatatypes => &[Axis::DataType],
            Self::DatatypesByFinYears => &[Axis::ObservedPeriod],
            Self::DatatypesByPublishers => &[Axis::Publisher],
            Self::DatatypesByFinYearsAndPublishers => &[Axis::ObservedPeriod, Axis::Publisher],
        }
    }

    /// Row and column axes after applying the transpose flag.
    pub const fn oriented_axes(self, transpose: bool) -> (&'static [Axis], &'static [Axis]) {
        if transpose {
            (self.column_axes(), self.row_axes())
        } else {
            (self.row_axes(), self.column_axes())
        }
    }
}

/// Borrowed view over the four axes of a command.
#[derive(Debug, Clone, Copy)]
pub struct AxisSet<'a> {
    /// Subject codes in caller order.
    pub subjects: &'a [String],
    /// Data type names in caller order.
    pub data_types: &'a [String],
    /// Publisher codes in caller order.
    pub publishers: &'a [String],
    /// Observed period tokens in caller order.
    pub observed_periods: &'a [String],
}

impl<'a> AxisSet<'a> {
    /// Entries of a single axis.
    pub fn values(&self, axis: Axis) -> &'a [String] {
        match axis {
            Axis::Subject => self.subjects,
            Axis::DataType => self.data_types,
            Axis::Publisher => self.publishers,
            Axis::ObservedPeriod => self.observed_periods,
        }
    }

    /// Entry count of an axis; an empty axis counts as one implicit entry.
    pub fn len(&self, axis: Axis) -> usize {
        self.values(axis).len().max(1)
    }

    /// Number of grid lines produced by combining `axes`.
    pub fn count(&self, axes: &[Axis]) -> usize {
        axes.iter().map(|axis| self.len(*axis)).product()
    }

    /// Labels produced by combining `axes` as a cartesian product in order.
    pub fn labels(&self, axes: &[Axis]) -> Vec<String> {
        let mut labels = vec![String::new()];
        for axis in axes {
            let values = self.values(*axis);
            if values.is_empty() {
                continue;
            }
            labels = labels
                .iter()
                .flat_map(|prefix| {
                    values.iter().map(move |value| {
                        if prefix.is_empty() {
                            value.clone()
                        } else {
                            format!("{} {}", prefix, value)
                        }
                    })
                })
                .collect();
        }
        labels
    }

    /// Entry of `axis` addressed by grid line `index` of a side built from `axes`.
    ///
    /// Returns `None` when `axis` is not on that side, when the axis is empty
    /// or when `index` lies outside the side.
    pub fn entry_at(&self, axes: &[Axis], index: usize, axis: Axis) -> Option<&'a str> {
        if index >= self.count(axes) {
            return None;
        }
        let mut remaining = index;
        for current in axes.iter().rev() {
            let len = self.len(*current);
            let position = remaining % len;
            remaining /= len;
            if *current == axis {
                return self.values(axis).get(position).map(String::as_str);
            }
        }
        None
    }

    /// `(rows, columns)` of the data body for `layout`.
    pub fn expected_shape(&self, layout: Observations2DLayout, transpose: bool) -> (usize, usize) {
        let (rows, columns) = layout.oriented_axes(transpose);
        (self.count(rows), self.count(columns))
    }

    /// Row labels expected in column 0 of a retrieval grid.
    pub fn expected_row_labels(&self, layout: Observations2DLayout, transpose: bool) -> Vec<String> {
        self.labels(layout.oriented_axes(transpose).0)
    }

    /// Column labels expected in row 0 of a retrieval grid.
    pub fn expected_column_labels(
        &self,
        layout: Observations2DLayout,
        transpose: bool,
    ) -> Vec<String> {
        self.labels(layout.oriented_axes(transpose).1)
    }
}
