use super::types::{DownsizePlan, RealEstate};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyState {
    pub value: f64,
    pub cost_base: f64,
    pub mortgage_balance: f64,
    pub monthly_payment: f64,
    pub mortgage_rate: f64,
    pub appreciation_rate: f64,
    pub principal_residence: bool,
    pub downsize: Option<DownsizePlan>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PropertyYear {
    pub mortgage_paid: f64,
    pub downsize_proceeds: f64,
    /// Gain on sale; zero for a principal residence.
    pub taxable_gain: f64,
    pub downsized: bool,
}

impl PropertyState {
    pub fn from_real_estate(real_estate: &RealEstate) -> Self {
        Self {
            value: real_estate.value.max(0.0),
            cost_base: real_estate.purchase_price.max(0.0),
            mortgage_balance: real_estate.mortgage_balance.max(0.0),
            monthly_payment: real_estate.monthly_payment.max(0.0),
            mortgage_rate: real_estate.mortgage_rate,
            appreciation_rate: real_estate.appreciation_rate,
            principal_residence: real_estate.principal_residence,
            downsize: real_estate.downsize.clone(),
        }
    }

    pub fn equity(&self) -> f64 {
        (self.value - self.mortgage_balance).max(0.0)
    }

    /// Downsize if scheduled, pay the mortgage for the year, then appreciate.
    pub fn step(&mut self, age: u32) -> PropertyYear {
        let mut year = PropertyYear::default();

        if self.downsize.as_ref().is_some_and(|plan| plan.age == age) {
            if let Some(plan) = self.downsize.take() {
                let sale_price = self.value;
                if !self.principal_residence {
                    year.taxable_gain = (sale_price - self.cost_base).max(0.0);
                }
                let new_home = plan.new_home_cost.max(0.0).min(sale_price);
                let released = sale_price - self.mortgage_balance - new_home;
                year.downsize_proceeds = released.max(0.0);
                year.downsized = true;
                self.value = new_home;
                self.cost_base = new_home;
                // Debt the sale cannot clear moves onto the new home.
                self.mortgage_balance = (-released).max(0.0);
                if self.mortgage_balance == 0.0 {
                    self.monthly_payment = 0.0;
                }
            }
        }

        if self.mortgage_balance > 0.0 {
            let interest = self.mortgage_balance * self.mortgage_rate.max(0.0);
            let owing = self.mortgage_balance + interest;
            let paid = (self.monthly_payment * 12.0).min(owing);
            self.mortgage_balance = owing - paid;
            year.mortgage_paid = paid;
        }

        self.value = (self.value * (1.0 + self.appreciation_rate)).max(0.0);
        year
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> RealEstate {
        RealEstate {
            value: 800_000.0,
            purchase_price: 300_000.0,
            mortgage_balance: 10_000.0,
            monthly_payment: 1_000.0,
            mortgage_rate: 0.05,
            appreciation_rate: 0.03,
            principal_residence: true,
            downsize: None,
        }
    }

    #[test]
    fn mortgage_payment_stops_when_paid_off() {
        let mut state = PropertyState::from_real_estate(&home());
        let year = state.step(65);
        assert!((year.mortgage_paid - 10_500.0).abs() < 1e-9);
        assert_eq!(state.mortgage_balance, 0.0);
        assert!((state.value - 824_000.0).abs() < 1e-6);
        assert_eq!(state.step(66).mortgage_paid, 0.0);
    }

    #[test]
    fn downsizing_releases_equity_tax_free_for_principal_residence() {
        let mut real_estate = home();
        real_estate.downsize = Some(DownsizePlan {
            age: 70,
            new_home_cost: 400_000.0,
        });
        let mut state = PropertyState::from_real_estate(&real_estate);
        assert!(!state.step(69).downsized);
        let value_before = state.value;
        let year = state.step(70);
        assert!(year.downsized);
        assert_eq!(year.taxable_gain, 0.0);
        assert!((year.downsize_proceeds - (value_before - 400_000.0)).abs() < 1e-6);
        assert!((state.value - 400_000.0 * 1.03).abs() < 1e-6);
        assert!(!state.step(71).downsized);
    }

    #[test]
    fn downsizing_carries_unpaid_mortgage_to_new_home() {
        let real_estate = RealEstate {
            value: 500_000.0,
            purchase_price: 300_000.0,
            mortgage_balance: 100_000.0,
            monthly_payment: 1_000.0,
            mortgage_rate: 0.0,
            appreciation_rate: 0.0,
            principal_residence: true,
            downsize: Some(DownsizePlan {
                age: 70,
                new_home_cost: 450_000.0,
            }),
        };
        let mut state = PropertyState::from_real_estate(&real_estate);
        let equity_before = state.equity();
        let year = state.step(70);
        assert!(year.downsized);
        assert_eq!(year.downsize_proceeds, 0.0);
        assert!((state.mortgage_balance - 38_000.0).abs() < 1e-6);
        assert!((year.mortgage_paid - 12_000.0).abs() < 1e-6);
        // Equity only grows by the principal repaid from outside cash.
        let equity_after = state.equity();
        assert!((equity_after - (equity_before + year.mortgage_paid)).abs() < 1e-6);
    }

    #[test]
    fn downsizing_a_non_residence_realizes_gain() {
        let mut real_estate = home();
        real_estate.principal_residence = false;
        real_estate.mortgage_balance = 0.0;
        real_estate.downsize = Some(DownsizePlan {
            age: 65,
            new_home_cost: 0.0,
        });
        let mut state = PropertyState::from_real_estate(&real_estate);
        let year = state.step(65);
        assert!((year.taxable_gain - 500_000.0).abs() < 1e-6);
        assert!((year.downsize_proceeds - 800_000.0).abs() < 1e-6);
        assert_eq!(state.equity(), 0.0);
    }
}
