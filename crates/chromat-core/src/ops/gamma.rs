//! Gamma op — per-channel power curves.
//!
//! Two families: `Basic` is a pure power function, `Moncurve` is a power
//! segment with a linear toe below an offset-derived break point (the
//! sRGB / CIE L* construction). Direction is folded into the style so a
//! stored gamma op is always forward.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ops::{Op, OpData, OpParams, TransformDirection};

/// Per-channel parameter list: 1 value for basic (gamma), 2 for moncurve
/// (gamma, offset). The count is validated against the style.
pub type Params = Vec<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GammaStyle {
    BasicFwd,
    BasicRev,
    MoncurveFwd,
    MoncurveRev,
}

impl GammaStyle {
    pub fn is_basic(self) -> bool {
        matches!(self, Self::BasicFwd | Self::BasicRev)
    }

    pub fn reversed(self) -> Self {
        match self {
            Self::BasicFwd => Self::BasicRev,
            Self::BasicRev => Self::BasicFwd,
            Self::MoncurveFwd => Self::MoncurveRev,
            Self::MoncurveRev => Self::MoncurveFwd,
        }
    }
}

/// Validated parameters for a gamma op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GammaOpData {
    style: GammaStyle,
    red: Params,
    green: Params,
    blue: Params,
    alpha: Params,
}

impl GammaOpData {
    pub fn new(style: GammaStyle, red: Params, green: Params, blue: Params, alpha: Params) -> Self {
        Self {
            style,
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Same basic gamma on RGB, identity alpha.
    pub fn basic_rgb(style: GammaStyle, gamma: f64) -> Self {
        debug_assert!(style.is_basic());
        Self::new(
            style,
            vec![gamma],
            vec![gamma],
            vec![gamma],
            vec![1.0],
        )
    }

    pub fn style(&self) -> GammaStyle {
        self.style
    }

    pub fn red(&self) -> &Params {
        &self.red
    }

    pub fn green(&self) -> &Params {
        &self.green
    }

    pub fn blue(&self) -> &Params {
        &self.blue
    }

    pub fn alpha(&self) -> &Params {
        &self.alpha
    }

    pub fn channels(&self) -> [&Params; 4] {
        [&self.red, &self.green, &self.blue, &self.alpha]
    }

    pub fn validate(&self) -> Result<()> {
        for params in self.channels() {
            validate_params(self.style, params)?;
        }
        Ok(())
    }

    /// Identity parameters: basic gamma 1, moncurve gamma 1 offset 0.
    pub fn is_identity(&self) -> bool {
        self.channels().iter().all(|p| match self.style {
            GammaStyle::BasicFwd | GammaStyle::BasicRev => p[0] == 1.0,
            GammaStyle::MoncurveFwd | GammaStyle::MoncurveRev => p[0] == 1.0 && p[1] == 0.0,
        })
    }

    /// A basic identity still clamps negative inputs, so only the moncurve
    /// identity (a pure linear segment) is removable.
    pub fn is_noop(&self) -> bool {
        !self.style.is_basic() && self.is_identity()
    }

    /// Styles are inverse pairs with identical parameters.
    pub fn is_inverse(&self, other: &Self) -> bool {
        self.style.reversed() == other.style
            && self.red == other.red
            && self.green == other.green
            && self.blue == other.blue
            && self.alpha == other.alpha
    }

    /// Basic gammas compose by multiplying effective exponents, provided
    /// every combined exponent stays inside the valid basic domain.
    pub fn may_compose(&self, other: &Self) -> bool {
        if !self.style.is_basic() || !other.style.is_basic() {
            return false;
        }
        let exponent = |p: &Params, style: GammaStyle| {
            if style == GammaStyle::BasicFwd {
                p[0]
            } else {
                1.0 / p[0]
            }
        };
        self.channels()
            .into_iter()
            .zip(other.channels())
            .all(|(a, b)| {
                let combined = exponent(a, self.style) * exponent(b, other.style);
                (0.01..=100.0).contains(&combined)
            })
    }

    /// Closed-form composition of two basic gammas into one forward op.
    ///
    /// Must only be called after [`may_compose`](Self::may_compose); the
    /// result bypasses range validation since both inputs were validated.
    pub fn compose(&self, other: &Self) -> Result<Self> {
        if !self.may_compose(other) {
            return Err(Error::Internal(
                "gamma compose called on non-basic styles".into(),
            ));
        }
        let exponent = |p: &Params, style: GammaStyle| {
            if style == GammaStyle::BasicFwd {
                p[0]
            } else {
                1.0 / p[0]
            }
        };
        let combine = |a: &Params, b: &Params| {
            vec![exponent(a, self.style) * exponent(b, other.style)]
        };
        Ok(Self::new(
            GammaStyle::BasicFwd,
            combine(&self.red, &other.red),
            combine(&self.green, &other.green),
            combine(&self.blue, &other.blue),
            combine(&self.alpha, &other.alpha),
        ))
    }
}

fn validate_params(style: GammaStyle, params: &Params) -> Result<()> {
    match style {
        GammaStyle::BasicFwd | GammaStyle::BasicRev => {
            if params.len() != 1 {
                return Err(Error::param(
                    "gamma",
                    format!("basic style requires 1 parameter, found {}", params.len()),
                ));
            }
            let g = params[0];
            if !(0.01..=100.0).contains(&g) {
                return Err(Error::param(
                    "gamma",
                    format!("basic gamma {g} outside [0.01, 100]"),
                ));
            }
        }
        GammaStyle::MoncurveFwd | GammaStyle::MoncurveRev => {
            if params.len() != 2 {
                return Err(Error::param(
                    "gamma",
                    format!("moncurve style requires 2 parameters, found {}", params.len()),
                ));
            }
            let (g, off) = (params[0], params[1]);
            if !(1.0..=10.0).contains(&g) {
                return Err(Error::param(
                    "gamma",
                    format!("moncurve gamma {g} outside [1, 10]"),
                ));
            }
            if !(0.0..0.9).contains(&off) {
                return Err(Error::param(
                    "gamma",
                    format!("moncurve offset {off} outside [0, 0.9)"),
                ));
            }
        }
    }
    Ok(())
}

/// Append a gamma op, folding an inverse direction into the style.
pub fn create_gamma_op(
    ops: &mut Vec<Op>,
    data: GammaOpData,
    direction: TransformDirection,
) -> Result<()> {
    data.validate()?;
    let data = match direction {
        TransformDirection::Forward => data,
        TransformDirection::Inverse => GammaOpData::new(
            data.style.reversed(),
            data.red.clone(),
            data.green.clone(),
            data.blue.clone(),
            data.alpha.clone(),
        ),
    };
    ops.push(Op::forward(OpData::new(OpParams::Gamma(data))));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_gamma_rejected() {
        let g = GammaOpData::basic_rgb(GammaStyle::BasicFwd, 0.0);
        assert!(g.validate().is_err());
        let g = GammaOpData::basic_rgb(GammaStyle::BasicFwd, -2.0);
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_wrong_param_count_rejected() {
        let g = GammaOpData::new(
            GammaStyle::BasicFwd,
            vec![2.2, 0.1],
            vec![2.2],
            vec![2.2],
            vec![1.0],
        );
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_moncurve_offset_domain() {
        let g = GammaOpData::new(
            GammaStyle::MoncurveFwd,
            vec![2.4, 0.955],
            vec![2.4, 0.055],
            vec![2.4, 0.055],
            vec![1.0, 0.0],
        );
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_basic_identity_is_not_noop() {
        let g = GammaOpData::basic_rgb(GammaStyle::BasicFwd, 1.0);
        assert!(g.is_identity());
        assert!(!g.is_noop(), "basic gamma clamps negatives even at 1.0");
    }

    #[test]
    fn test_moncurve_identity_is_noop() {
        let g = GammaOpData::new(
            GammaStyle::MoncurveFwd,
            vec![1.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 0.0],
        );
        assert!(g.is_noop());
    }

    #[test]
    fn test_inverse_pair_detection() {
        let fwd = GammaOpData::basic_rgb(GammaStyle::BasicFwd, 2.2);
        let rev = GammaOpData::basic_rgb(GammaStyle::BasicRev, 2.2);
        assert!(fwd.is_inverse(&rev));
        assert!(rev.is_inverse(&fwd));
        assert!(!fwd.is_inverse(&fwd));
    }

    #[test]
    fn test_compose_multiplies_effective_exponents() {
        let a = GammaOpData::basic_rgb(GammaStyle::BasicFwd, 2.0);
        let b = GammaOpData::basic_rgb(GammaStyle::BasicRev, 4.0);
        let c = a.compose(&b).expect("basic styles compose");
        assert_eq!(c.style(), GammaStyle::BasicFwd);
        assert!((c.red()[0] - 0.5).abs() < 1e-12);
    }
}
