//! Operation codes accepted in `CONTROL[3:0]`.
//!
//! Codes 0–3 are plain IEEE-754 arithmetic on the two operands. Codes 4–14
//! are streaming statistics evaluated by the IP over the most recent
//! `window_size` prices in its circular buffer. Code 15 is unassigned.

use core::fmt;
use core::str::FromStr;

/// Accelerator operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operation {
    /// A + B
    Add = 0,
    /// A - B
    Sub = 1,
    /// A × B
    Mul = 2,
    /// A ÷ B
    Div = 3,
    /// Simple moving average.
    Sma = 4,
    /// Exponential moving average (uses `EMA_ALPHA`).
    Ema = 5,
    /// Weighted moving average.
    Wma = 6,
    /// Volume-weighted average price.
    Vwap = 7,
    /// Standard deviation.
    StdDev = 8,
    /// Relative strength index.
    Rsi = 9,
    /// Bollinger upper band (mean + 2σ).
    BollingerUpper = 10,
    /// Bollinger lower band (mean − 2σ).
    BollingerLower = 11,
    /// Minimum over window.
    Min = 12,
    /// Maximum over window.
    Max = 13,
    /// Max − min over window.
    Range = 14,
}

impl Operation {
    /// Every operation, in opcode order.
    pub const ALL: [Self; 15] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Sma,
        Self::Ema,
        Self::Wma,
        Self::Vwap,
        Self::StdDev,
        Self::Rsi,
        Self::BollingerUpper,
        Self::BollingerLower,
        Self::Min,
        Self::Max,
        Self::Range,
    ];

    /// Decode a raw opcode. `None` for codes outside the enumeration.
    pub const fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::Add,
            1 => Self::Sub,
            2 => Self::Mul,
            3 => Self::Div,
            4 => Self::Sma,
            5 => Self::Ema,
            6 => Self::Wma,
            7 => Self::Vwap,
            8 => Self::StdDev,
            9 => Self::Rsi,
            10 => Self::BollingerUpper,
            11 => Self::BollingerLower,
            12 => Self::Min,
            13 => Self::Max,
            14 => Self::Range,
            _ => return None,
        })
    }

    /// 4-bit opcode.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Two-operand arithmetic (codes 0–3).
    pub const fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div)
    }

    /// Evaluated over the price buffer window (codes 4–14).
    pub const fn is_windowed(self) -> bool {
        !self.is_arithmetic()
    }

    /// Reads the smoothing factor from `EMA_ALPHA`.
    pub const fn uses_alpha(self) -> bool {
        matches!(self, Self::Ema)
    }

    /// Mnemonic used in logs and the IP documentation.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Sma => "SMA",
            Self::Ema => "EMA",
            Self::Wma => "WMA",
            Self::Vwap => "VWAP",
            Self::StdDev => "STD_DEV",
            Self::Rsi => "RSI",
            Self::BollingerUpper => "BOLLINGER_UP",
            Self::BollingerLower => "BOLLINGER_DN",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Range => "RANGE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Raw opcode outside the declared enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownOpcode(pub u32);

impl fmt::Display for UnknownOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown opcode {:#x}", self.0)
    }
}

impl std::error::Error for UnknownOpcode {}

impl TryFrom<u32> for Operation {
    type Error = UnknownOpcode;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(UnknownOpcode(code))
    }
}

/// Operation name that matches no mnemonic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMnemonic(pub String);

impl fmt::Display for UnknownMnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown operation '{}'", self.0)
    }
}

impl std::error::Error for UnknownMnemonic {}

impl FromStr for Operation {
    type Err = UnknownMnemonic;

    /// Case-insensitive; `-` and `_` are interchangeable, and the short forms
    /// `stddev`, `bollinger-upper` and `bollinger-lower` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_uppercase().replace('-', "_");
        let alias = match norm.as_str() {
            "STDDEV" => Some(Self::StdDev),
            "BOLLINGER_UPPER" => Some(Self::BollingerUpper),
            "BOLLINGER_LOWER" => Some(Self::BollingerLower),
            _ => None,
        };
        alias
            .or_else(|| Self::ALL.into_iter().find(|op| op.mnemonic() == norm))
            .ok_or_else(|| UnknownMnemonic(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_dense_and_ordered() {
        for (i, op) in Operation::ALL.iter().enumerate() {
            assert_eq!(usize::from(op.code()), i);
            assert_eq!(Operation::from_code(i as u32), Some(*op));
        }
        assert_eq!(Operation::from_code(15), None);
        assert_eq!(Operation::try_from(0xFFu32), Err(UnknownOpcode(0xFF)));
    }

    #[test]
    fn families() {
        let arithmetic: Vec<_> = Operation::ALL.into_iter().filter(|o| o.is_arithmetic()).collect();
        assert_eq!(arithmetic, [Operation::Add, Operation::Sub, Operation::Mul, Operation::Div]);
        assert!(Operation::Range.is_windowed());
        assert!(Operation::Ema.uses_alpha());
        assert!(!Operation::Sma.uses_alpha());
    }

    #[test]
    fn parse_mnemonics() {
        assert_eq!("add".parse::<Operation>(), Ok(Operation::Add));
        assert_eq!("STD_DEV".parse::<Operation>(), Ok(Operation::StdDev));
        assert_eq!("stddev".parse::<Operation>(), Ok(Operation::StdDev));
        assert_eq!("bollinger-up".parse::<Operation>(), Ok(Operation::BollingerUpper));
        assert_eq!("bollinger-lower".parse::<Operation>(), Ok(Operation::BollingerLower));
        assert!("mod".parse::<Operation>().is_err());
        for op in Operation::ALL {
            assert_eq!(op.to_string().parse::<Operation>(), Ok(op));
        }
    }
}
