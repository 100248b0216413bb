use super::types::{BucketAllocation, DividendType, Person, Yields};

/// Share of corporate investment income added to RDTOH.
pub const RDTOH_ACCRUAL_RATE: f64 = 0.3067;
/// Refund per dollar of non-eligible dividend paid, drawn from RDTOH.
pub const RDTOH_REFUND_RATE: f64 = 0.3833;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Distributions {
    pub interest: f64,
    pub eligible_dividends: f64,
    pub non_eligible_dividends: f64,
    /// Capital-gain distributions plus any return of capital above ACB.
    pub capital_gains: f64,
    pub return_of_capital: f64,
    pub cash_paid_out: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sale {
    pub proceeds: f64,
    pub from_cash: f64,
    pub from_gic: f64,
    pub from_invested: f64,
    pub realized_gain: f64,
    pub acb_released: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BucketedAccount {
    pub cash: f64,
    pub gic: f64,
    pub invested: f64,
    pub invested_acb: f64,
}

impl BucketedAccount {
    pub fn from_allocation(total: f64, allocation: &BucketAllocation, invested_acb: f64) -> Self {
        let total = total.max(0.0);
        let weights = [
            allocation.cash_pct.max(0.0),
            allocation.gic_pct.max(0.0),
            allocation.invested_pct.max(0.0),
        ];
        let sum: f64 = weights.iter().sum();
        if sum <= 0.0 {
            return Self {
                cash: 0.0,
                gic: 0.0,
                invested: total,
                invested_acb: invested_acb.max(0.0),
            };
        }
        Self {
            cash: total * weights[0] / sum,
            gic: total * weights[1] / sum,
            invested: total * weights[2] / sum,
            invested_acb: invested_acb.max(0.0),
        }
    }

    pub fn total(&self) -> f64 {
        self.cash + self.gic + self.invested
    }

    pub fn acb_fraction(&self) -> f64 {
        if self.invested <= 0.0 {
            return 1.0;
        }
        self.invested_acb / self.invested
    }

    /// Books the year's distributions on opening balances. Return of capital
    /// reduces ACB; any excess over ACB is reported as a capital gain.
    pub fn accrue(&mut self, yields: &Yields, reinvest: bool) -> Distributions {
        let cash_interest = self.cash * yields.cash_interest;
        let gic_interest = self.gic * yields.gic_interest;
        let eligible = self.invested * yields.eligible_dividend;
        let non_eligible = self.invested * yields.non_eligible_dividend;
        let gain_distribution = self.invested * yields.capital_gain_distribution;
        let roc = self.invested * yields.return_of_capital;

        let excess_roc_gain = self.apply_return_of_capital(roc);

        let mut distributions = Distributions {
            interest: cash_interest + gic_interest,
            eligible_dividends: eligible,
            non_eligible_dividends: non_eligible,
            capital_gains: gain_distribution + excess_roc_gain,
            return_of_capital: roc,
            cash_paid_out: 0.0,
        };

        if reinvest {
            self.cash += cash_interest;
            self.gic += gic_interest;
            let reinvested = eligible + non_eligible + gain_distribution + roc;
            self.invested += reinvested;
            self.invested_acb += reinvested;
        } else {
            distributions.cash_paid_out = cash_interest
                + gic_interest
                + eligible
                + non_eligible
                + gain_distribution
                + roc;
        }
        distributions
    }

    fn apply_return_of_capital(&mut self, roc: f64) -> f64 {
        if roc <= 0.0 {
            return 0.0;
        }
        self.invested_acb -= roc;
        if self.invested_acb < 0.0 {
            let excess = -self.invested_acb;
            self.invested_acb = 0.0;
            excess
        } else {
            0.0
        }
    }

    /// What a withdrawal of `amount` would realize, without moving money.
    /// Buckets are drawn cash first, then GIC, then invested.
    pub fn preview_sale(&self, amount: f64) -> Sale {
        let mut remaining = amount.max(0.0).min(self.total());
        let from_cash = remaining.min(self.cash);
        remaining -= from_cash;
        let from_gic = remaining.min(self.gic);
        remaining -= from_gic;
        let from_invested = remaining.min(self.invested);

        let acb_released = if self.invested > 0.0 {
            from_invested * self.acb_fraction()
        } else {
            0.0
        };
        Sale {
            proceeds: from_cash + from_gic + from_invested,
            from_cash,
            from_gic,
            from_invested,
            realized_gain: from_invested - acb_released,
            acb_released,
        }
    }

    pub fn withdraw(&mut self, amount: f64) -> Sale {
        let sale = self.preview_sale(amount);
        self.cash = (self.cash - sale.from_cash).max(0.0);
        self.gic = (self.gic - sale.from_gic).max(0.0);
        self.invested = (self.invested - sale.from_invested).max(0.0);
        self.invested_acb = (self.invested_acb - sale.acb_released).max(0.0);
        sale
    }

    /// Price growth on the invested bucket net of the distribution yield.
    pub fn grow(&mut self, yields: &Yields) {
        let price_return = yields.invested_total_return - yields.invested_distribution_rate();
        self.invested = (self.invested * (1.0 + price_return)).max(0.0);
    }

    pub fn deposit_cash(&mut self, amount: f64) {
        self.cash += amount.max(0.0);
    }

    pub fn unrealized_gain(&self) -> f64 {
        self.invested - self.invested_acb
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CorporateAccount {
    pub holdings: BucketedAccount,
    pub rdtoh: f64,
}

impl CorporateAccount {
    pub fn total(&self) -> f64 {
        self.holdings.total()
    }

    /// Investment income stays inside the corporation; RDTOH accrues on it.
    pub fn accrue(&mut self, yields: &Yields) -> Distributions {
        let distributions = self.holdings.accrue(yields, true);
        let refundable_base = distributions.interest + 0.5 * distributions.capital_gains;
        self.rdtoh += RDTOH_ACCRUAL_RATE * refundable_base.max(0.0);
        distributions
    }

    /// Pays a dividend of exactly `amount` (capped at holdings). Returns the
    /// cash paid and the RDTOH released by the payment. Only non-eligible
    /// dividends draw down the pool.
    pub fn pay_dividend(&mut self, amount: f64, dividend_type: DividendType) -> (f64, f64) {
        let sale = self.holdings.withdraw(amount);
        let refund = match dividend_type {
            DividendType::NonEligible => {
                (RDTOH_REFUND_RATE * sale.proceeds).min(self.rdtoh).max(0.0)
            }
            DividendType::Eligible => 0.0,
        };
        self.rdtoh -= refund;
        (sale.proceeds, refund)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PersonAccounts {
    pub rrif: f64,
    pub rrsp: f64,
    pub tfsa: f64,
    pub tfsa_room: f64,
    pub nonreg: BucketedAccount,
    pub corporate: CorporateAccount,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegisteredDraw {
    pub from_rrif: f64,
    pub from_rrsp: f64,
}

impl PersonAccounts {
    pub fn from_person(person: &Person) -> Self {
        let corporate_holdings = BucketedAccount::from_allocation(
            person.corporate_balance,
            &person.corporate_allocation,
            0.0,
        );
        Self {
            rrif: person.rrif.max(0.0),
            rrsp: person.rrsp.max(0.0),
            tfsa: person.tfsa.max(0.0),
            tfsa_room: person.tfsa_room.max(0.0),
            nonreg: BucketedAccount::from_allocation(
                person.nonreg_balance,
                &person.nonreg_allocation,
                person.nonreg_acb,
            ),
            corporate: CorporateAccount {
                holdings: BucketedAccount {
                    invested_acb: corporate_holdings.invested,
                    ..corporate_holdings
                },
                rdtoh: person.corporate_rdtoh.max(0.0),
            },
        }
    }

    pub fn registered(&self) -> f64 {
        self.rrif + self.rrsp
    }

    pub fn total(&self) -> f64 {
        self.rrif + self.rrsp + self.tfsa + self.nonreg.total() + self.corporate.total()
    }

    pub fn convert_rrsp(&mut self) -> f64 {
        let amount = self.rrsp;
        self.rrif += amount;
        self.rrsp = 0.0;
        amount
    }

    pub fn split_registered(&self, amount: f64) -> RegisteredDraw {
        let amount = amount.max(0.0).min(self.registered());
        let from_rrif = amount.min(self.rrif);
        RegisteredDraw {
            from_rrif,
            from_rrsp: amount - from_rrif,
        }
    }

    pub fn withdraw_registered(&mut self, amount: f64) -> RegisteredDraw {
        let draw = self.split_registered(amount);
        self.rrif = (self.rrif - draw.from_rrif).max(0.0);
        self.rrsp = (self.rrsp - draw.from_rrsp).max(0.0);
        draw
    }

    pub fn withdraw_tfsa(&mut self, amount: f64) -> f64 {
        let amount = amount.max(0.0).min(self.tfsa);
        self.tfsa -= amount;
        amount
    }

    pub fn contribute_tfsa(&mut self, amount: f64) -> f64 {
        let amount = amount.max(0.0).min(self.tfsa_room);
        self.tfsa += amount;
        self.tfsa_room -= amount;
        amount
    }

    /// January 1 room: unused room, this year's withdrawals, next year's limit.
    pub fn roll_tfsa_room(&mut self, withdrawn_this_year: f64, next_year_limit: f64) {
        self.tfsa_room += withdrawn_this_year.max(0.0) + next_year_limit.max(0.0);
    }

    pub fn grow_registered(&mut self, growth: f64) {
        self.rrif = (self.rrif * (1.0 + growth)).max(0.0);
        self.rrsp = (self.rrsp * (1.0 + growth)).max(0.0);
        self.tfsa = (self.tfsa * (1.0 + growth)).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn invested_only(balance: f64, acb: f64) -> BucketedAccount {
        BucketedAccount {
            cash: 0.0,
            gic: 0.0,
            invested: balance,
            invested_acb: acb,
        }
    }

    #[test]
    fn allocation_splits_total_by_percent() {
        let account = BucketedAccount::from_allocation(
            100_000.0,
            &BucketAllocation {
                cash_pct: 10.0,
                gic_pct: 30.0,
                invested_pct: 60.0,
            },
            40_000.0,
        );
        assert_approx(account.cash, 10_000.0);
        assert_approx(account.gic, 30_000.0);
        assert_approx(account.invested, 60_000.0);
        assert_approx(account.invested_acb, 40_000.0);
    }

    #[test]
    fn sale_realizes_gain_on_proportional_acb() {
        let mut account = invested_only(100_000.0, 40_000.0);
        let sale = account.withdraw(10_000.0);
        assert_approx(sale.realized_gain, 10_000.0 * (1.0 - 0.4));
        assert_approx(account.invested_acb, 36_000.0);
        assert_approx(account.invested, 90_000.0);
    }

    #[test]
    fn sale_draws_cash_then_gic_before_invested() {
        let mut account = BucketedAccount {
            cash: 1_000.0,
            gic: 2_000.0,
            invested: 10_000.0,
            invested_acb: 5_000.0,
        };
        let sale = account.withdraw(4_000.0);
        assert_approx(sale.from_cash, 1_000.0);
        assert_approx(sale.from_gic, 2_000.0);
        assert_approx(sale.from_invested, 1_000.0);
        assert_approx(sale.realized_gain, 500.0);
    }

    #[test]
    fn preview_matches_withdraw_and_leaves_state_untouched() {
        let account = invested_only(50_000.0, 20_000.0);
        let preview = account.preview_sale(12_345.0);
        let mut moved = account;
        let sale = moved.withdraw(12_345.0);
        assert_eq!(preview, sale);
        assert_approx(account.invested, 50_000.0);
    }

    #[test]
    fn return_of_capital_reduces_acb_and_excess_is_gain() {
        let yields = Yields {
            return_of_capital: 0.10,
            ..Yields::default()
        };
        let mut account = invested_only(100_000.0, 5_000.0);
        let dist = account.accrue(&yields, false);
        assert_approx(dist.return_of_capital, 10_000.0);
        assert_approx(dist.capital_gains, 5_000.0);
        assert_approx(account.invested_acb, 0.0);
        assert_approx(dist.cash_paid_out, 10_000.0);
    }

    #[test]
    fn reinvested_distributions_raise_balance_and_acb() {
        let yields = Yields {
            cash_interest: 0.02,
            eligible_dividend: 0.03,
            invested_total_return: 0.06,
            ..Yields::default()
        };
        let mut account = BucketedAccount {
            cash: 10_000.0,
            gic: 0.0,
            invested: 100_000.0,
            invested_acb: 80_000.0,
        };
        let dist = account.accrue(&yields, true);
        assert_approx(dist.cash_paid_out, 0.0);
        assert_approx(account.cash, 10_200.0);
        assert_approx(account.invested, 103_000.0);
        assert_approx(account.invested_acb, 83_000.0);
        account.grow(&yields);
        assert_approx(account.invested, 103_000.0 * 1.03);
    }

    #[test]
    fn corporate_dividend_pays_exact_amount_and_releases_rdtoh() {
        let mut corp = CorporateAccount {
            holdings: invested_only(200_000.0, 200_000.0),
            rdtoh: 5_000.0,
        };
        let (paid, refund) = corp.pay_dividend(30_000.0, DividendType::NonEligible);
        assert_approx(paid, 30_000.0);
        assert_approx(refund, 5_000.0);
        assert_approx(corp.rdtoh, 0.0);
        assert_approx(corp.total(), 170_000.0);
    }

    #[test]
    fn eligible_dividend_leaves_rdtoh_untouched() {
        let mut corp = CorporateAccount {
            holdings: invested_only(200_000.0, 200_000.0),
            rdtoh: 5_000.0,
        };
        let (paid, refund) = corp.pay_dividend(10_000.0, DividendType::Eligible);
        assert_approx(paid, 10_000.0);
        assert_approx(refund, 0.0);
        assert_approx(corp.rdtoh, 5_000.0);
    }

    #[test]
    fn corporate_interest_accrues_rdtoh() {
        let mut corp = CorporateAccount {
            holdings: BucketedAccount {
                cash: 100_000.0,
                ..BucketedAccount::default()
            },
            rdtoh: 0.0,
        };
        let yields = Yields {
            cash_interest: 0.05,
            ..Yields::default()
        };
        corp.accrue(&yields);
        assert_approx(corp.rdtoh, 5_000.0 * RDTOH_ACCRUAL_RATE);
        assert_approx(corp.total(), 105_000.0);
    }

    #[test]
    fn tfsa_room_caps_contributions_and_restores_withdrawals_next_year() {
        let mut accounts = PersonAccounts {
            tfsa: 10_000.0,
            tfsa_room: 5_000.0,
            ..PersonAccounts::default()
        };
        let withdrawn = accounts.withdraw_tfsa(3_000.0);
        let contributed = accounts.contribute_tfsa(9_000.0);
        assert_approx(contributed, 5_000.0);
        assert_approx(accounts.tfsa_room, 0.0);
        accounts.roll_tfsa_room(withdrawn, 7_000.0);
        assert_approx(accounts.tfsa_room, 10_000.0);
    }

    #[test]
    fn registered_draw_takes_rrif_before_rrsp() {
        let mut accounts = PersonAccounts {
            rrif: 5_000.0,
            rrsp: 20_000.0,
            ..PersonAccounts::default()
        };
        let draw = accounts.withdraw_registered(8_000.0);
        assert_approx(draw.from_rrif, 5_000.0);
        assert_approx(draw.from_rrsp, 3_000.0);
        assert_approx(accounts.registered(), 17_000.0);
    }

    proptest! {
        #[test]
        fn prop_acb_tracks_cost_minus_proportional_sales(
            balance in 1_000u32..1_000_000,
            acb_pct in 0u32..150,
            sales in proptest::collection::vec(0u32..100, 1..8)
        ) {
            let balance = balance as f64;
            let mut account = invested_only(balance, balance * acb_pct as f64 / 100.0);
            for pct in sales {
                let before_acb = account.invested_acb;
                let before_balance = account.invested;
                let amount = before_balance * pct as f64 / 100.0;
                let sale = account.withdraw(amount);
                if before_balance > 0.0 {
                    let expected_release = sale.proceeds * before_acb / before_balance;
                    prop_assert!((sale.acb_released - expected_release).abs() < 1e-6);
                    let expected_gain = sale.proceeds * (1.0 - before_acb / before_balance);
                    prop_assert!((sale.realized_gain - expected_gain).abs() < 1e-6);
                }
                prop_assert!(account.invested_acb >= 0.0);
                prop_assert!(account.invested >= 0.0);
                let expected_acb = (before_acb - sale.acb_released).max(0.0);
                prop_assert!((account.invested_acb - expected_acb).abs() < 1e-6);
            }
        }

        #[test]
        fn prop_withdrawals_never_exceed_balance(
            cash in 0u32..50_000,
            gic in 0u32..50_000,
            invested in 0u32..500_000,
            request in 0u32..1_000_000
        ) {
            let mut account = BucketedAccount {
                cash: cash as f64,
                gic: gic as f64,
                invested: invested as f64,
                invested_acb: invested as f64 * 0.5,
            };
            let total = account.total();
            let sale = account.withdraw(request as f64);
            prop_assert!(sale.proceeds <= total + 1e-9);
            prop_assert!((account.total() - (total - sale.proceeds)).abs() < 1e-6);
        }
    }
}
