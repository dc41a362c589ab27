/// Placement of the currency symbol relative to the amount.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SymbolPosition {
    #[default]
    Precede,
    Follow,
}

/// A money rendering: separators, currency symbol and precision.
///
/// Doubles as the source of the header's `Fmt`/`Dec`/`Thou` values via
/// [`MoneyFormat::qvd_pattern`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoneyFormat {
    pub thousand_separator: String,
    pub decimal_separator: String,
    pub currency_symbol: String,
    pub symbol_position: SymbolPosition,
    pub symbol_spaced: bool,
    pub precision: usize,
}

impl Default for MoneyFormat {
    fn default() -> Self {
        MoneyFormat {
            thousand_separator: ",".to_string(),
            decimal_separator: ".".to_string(),
            currency_symbol: "$".to_string(),
            symbol_position: SymbolPosition::Precede,
            symbol_spaced: false,
            precision: 2,
        }
    }
}

impl MoneyFormat {
    /// Render an amount. The sign stays attached to the digits, inside a
    /// preceding currency symbol (`$-1,234.50`).
    pub fn format(&self, value: f64) -> String {
        let mut out = String::new();
        if !self.currency_symbol.is_empty() && self.symbol_position == SymbolPosition::Precede {
            out.push_str(&self.currency_symbol);
            if self.symbol_spaced {
                out.push(' ');
            }
        }

        if value.is_sign_negative() {
            out.push('-');
        }
        out.push_str(&self.digits(value.abs()));

        if !self.currency_symbol.is_empty() && self.symbol_position == SymbolPosition::Follow {
            if self.symbol_spaced {
                out.push(' ');
            }
            out.push_str(&self.currency_symbol);
        }
        out
    }

    fn digits(&self, amount: f64) -> String {
        let plain = format!("{:.*}", self.precision, amount);
        let (int_part, frac_part) = match plain.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (plain.as_str(), None),
        };

        let mut grouped = String::with_capacity(plain.len() + int_part.len() / 3);
        if self.thousand_separator.is_empty() {
            grouped.push_str(int_part);
        } else {
            let digits: Vec<char> = int_part.chars().collect();
            for (i, ch) in digits.iter().enumerate() {
                if i > 0 && (digits.len() - i) % 3 == 0 {
                    grouped.push_str(&self.thousand_separator);
                }
                grouped.push(*ch);
            }
        }
        if let Some(frac) = frac_part {
            grouped.push_str(&self.decimal_separator);
            grouped.push_str(frac);
        }
        grouped
    }

    /// The `positive;negative` QVD format pattern for this rendering,
    /// e.g. `$#,##0.00;$-#,##0.00`.
    pub fn qvd_pattern(&self) -> String {
        let mut positive = String::new();
        let mut negative = String::new();
        if !self.currency_symbol.is_empty() && self.symbol_position == SymbolPosition::Precede {
            positive.push_str(&self.currency_symbol);
            negative.push_str(&self.currency_symbol);
            if self.symbol_spaced {
                positive.push(' ');
                negative.push(' ');
            }
        }
        negative.push('-');

        let mut body = String::new();
        if self.thousand_separator.is_empty() {
            body.push_str("###");
        } else {
            body.push('#');
            body.push_str(&self.thousand_separator);
            body.push_str("##");
        }
        body.push('0');
        if self.precision > 0 {
            body.push_str(&self.decimal_separator);
            for _ in 0..self.precision {
                body.push('0');
            }
        }
        positive.push_str(&body);
        negative.push_str(&body);

        if !self.currency_symbol.is_empty() && self.symbol_position == SymbolPosition::Follow {
            if self.symbol_spaced {
                positive.push(' ');
                negative.push(' ');
            }
            positive.push_str(&self.currency_symbol);
            negative.push_str(&self.currency_symbol);
        }
        format!("{positive};{negative}")
    }
}
