//! Thermal DOI Values
//!
//! Component values sampled onto the formula grid, one row per grid point.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use thermal_common::Timestamp;
use thermal_timeseries::{AttributeSlot, Stepper};

#[derive(Debug, Clone)]
enum Column {
    Constant(Option<f64>),
    Series(Vec<Option<f64>>),
}

/// Grid-aligned matrix of component values.
///
/// Dynamic attributes are resampled with carry-forward; constants repeat
/// their value on every row.
#[derive(Debug, Clone)]
pub struct DoiValues {
    timestamps: Vec<Timestamp>,
    columns: Vec<Column>,
}

impl DoiValues {
    pub fn new(slots: &[&AttributeSlot], from: Timestamp, to: Timestamp, step: &Stepper) -> Self {
        let timestamps: Vec<Timestamp> = step.grid(from, to).collect();
        let columns = slots
            .iter()
            .map(|slot| match slot {
                AttributeSlot::Constant(c) => Column::Constant(c.scalar()),
                AttributeSlot::Dynamic(a) => Column::Series(a.scalar_values(from, to, step, true)),
            })
            .collect();
        Self {
            timestamps,
            columns,
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamp(&self, i: usize) -> Option<Timestamp> {
        self.timestamps.get(i).copied()
    }

    /// Component values of row `i`, in slot order.
    pub fn row(&self, i: usize) -> Vec<Option<f64>> {
        self.columns
            .iter()
            .map(|column| match column {
                Column::Constant(v) => *v,
                Column::Series(values) => values.get(i).copied().flatten(),
            })
            .collect()
    }

    /// `(timestamp, row)` pairs in grid order.
    pub fn rows(&self) -> impl Iterator<Item = (Timestamp, Vec<Option<f64>>)> + '_ {
        self.timestamps
            .iter()
            .enumerate()
            .map(move |(i, ts)| (*ts, self.row(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermal_timeseries::{Attribute, ConstantAttribute};

    #[test]
    fn test_rows_mix_constants_and_series() {
        let mut cpu = Attribute::new("cpu");
        cpu.push(0, 1.0, 0);
        cpu.push(20, 3.0, 0);
        let cpu = AttributeSlot::from(cpu);
        let capacity = AttributeSlot::from(ConstantAttribute::with_value("capacity", 8.0));

        let values = DoiValues::new(&[&cpu, &capacity], 0, 30, &Stepper::fixed(10));
        assert_eq!(values.len(), 4);
        assert_eq!(values.row(0), vec![Some(1.0), Some(8.0)]);
        assert_eq!(values.row(1), vec![Some(1.0), Some(8.0)]);
        assert_eq!(values.row(3), vec![Some(3.0), Some(8.0)]);

        let stamps: Vec<_> = values.rows().map(|(ts, _)| ts).collect();
        assert_eq!(stamps, vec![0, 10, 20, 30]);
    }

    #[test]
    fn test_missing_values_before_data() {
        let mut cpu = Attribute::new("cpu");
        cpu.push(15, 2.0, 0);
        let cpu = AttributeSlot::from(cpu);

        let values = DoiValues::new(&[&cpu], 0, 20, &Stepper::fixed(10));
        assert_eq!(values.row(0), vec![None]);
        assert_eq!(values.row(2), vec![Some(2.0)]);
    }
}
