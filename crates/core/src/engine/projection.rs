use crate::domain::product::FinancialProduct;
use crate::domain::recommendation::ProjectedReturn;

/// Monthly-compounding projection of saving `target_amount / months` at the start of every
/// month. No tax, no fees. Amounts are rounded to whole currency units.
pub fn project_returns(
    product: &FinancialProduct,
    target_amount: f64,
    time_frame_months: u32,
) -> ProjectedReturn {
    project_with_rate(product.interest_rate_percent, target_amount, time_frame_months)
}

pub fn project_with_rate(
    annual_rate_percent: f64,
    target_amount: f64,
    time_frame_months: u32,
) -> ProjectedReturn {
    let months = time_frame_months.max(1);
    let monthly_amount = target_amount / f64::from(months);
    let monthly_rate = annual_rate_percent / 100.0 / 12.0;

    let mut balance = 0.0;
    for _ in 0..months {
        balance = (balance + monthly_amount) * (1.0 + monthly_rate);
    }

    let total_saved = (monthly_amount * f64::from(months)).round();
    let total_amount = balance.round();

    ProjectedReturn {
        total_saved,
        total_amount,
        interest: total_amount - total_saved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_returns_principal_only() {
        for (target, months) in [(6_000_000.0, 12), (1_000_000.0, 7), (123_456.0, 36)] {
            let r = project_with_rate(0.0, target, months);
            assert_eq!(r.total_amount, r.total_saved);
            assert_eq!(r.interest, 0.0);
        }
    }

    #[test]
    fn compounds_monthly_at_start_of_period() {
        // 12 x 100,000 at 12%/yr (1%/month), annuity-due.
        let r = project_with_rate(12.0, 1_200_000.0, 12);
        let expected: f64 = (1..=12).map(|k| 100_000.0 * 1.01f64.powi(k)).sum();
        assert_eq!(r.total_saved, 1_200_000.0);
        assert_eq!(r.total_amount, expected.round());
        assert_eq!(r.interest, expected.round() - 1_200_000.0);
        assert!(r.interest > 0.0);
    }

    #[test]
    fn single_month_earns_one_month_of_interest() {
        let r = project_with_rate(3.6, 1_000_000.0, 1);
        assert_eq!(r.total_amount, 1_003_000.0);
        assert_eq!(r.interest, 3_000.0);
    }
}
