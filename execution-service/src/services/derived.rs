//! Amount and completion figures derived from quantity, rate and work done.

/// Round half up to two decimals.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedFields {
    pub amount: f64,
    pub work_completion_percentage: f64,
    pub work_completion_amount: f64,
}

impl DerivedFields {
    pub fn compute(quantity: f64, rate: f64, work_status_in_units: f64) -> Self {
        let amount = quantity * rate;
        let work_completion_percentage = if quantity > 0.0 {
            round2(work_status_in_units / quantity * 100.0)
        } else {
            0.0
        };
        Self {
            amount,
            work_completion_percentage,
            work_completion_amount: amount * work_completion_percentage / 100.0,
        }
    }
}
