// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! One-dimensional kernels of coordinate-uniform figures of merit.
//!
//! A kernel `ω` maps the coordinate `x` in [0, 1) of a point in one
//! dimension to its contribution. The merit of a point set is
//! `Σ_u γ_u (1/n) Σ_i Π_{j∈u} ω(x_ij)`; the search engine only ever calls
//! [`Kernel::evaluate`] once per kernel table entry.
//!
//! Each kernel stores its [`KernelType`] as the single source of truth and
//! caches derived constants next to it.

use crate::errors::SearchError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Parameters of the available kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KernelType {
    /// `P_α` for integer lattices, through the Bernoulli polynomial `B_α`.
    /// `α` is 2, 4 or 6.
    PAlpha { alpha: u32 },

    /// `P_α` for polynomial lattices and digital nets in base 2, `α > 1`.
    PAlphaPlr { alpha: u32 },

    /// Interlaced `A_α` kernel, `α > 1` and interlacing factor `d > 1`.
    IaAlpha { alpha: u32, interlacing: u32 },
}

pub trait Kernel: fmt::Debug + Send + Sync {
    /// Contribution of coordinate `x` in [0, 1).
    fn evaluate(&self, x: f64) -> f64;

    /// Whether `evaluate(x) == evaluate(1 - x)`, which permits symmetric
    /// index compression.
    fn symmetric(&self) -> bool;

    fn name(&self) -> String;

    fn kind(&self) -> KernelType;
}

/// Build the kernel described by `kernel_type`, checking its parameters.
pub fn create_kernel(kernel_type: KernelType) -> Result<Box<dyn Kernel>, SearchError> {
    Ok(match kernel_type {
        KernelType::PAlpha { alpha } => Box::new(PAlpha::new(alpha)?),
        KernelType::PAlphaPlr { alpha } => Box::new(PAlphaPlr::new(alpha)?),
        KernelType::IaAlpha { alpha, interlacing } => Box::new(IaAlpha::new(alpha, interlacing)?),
    })
}

/// `ω(x) = -(-4π²)^(α/2) / α! · B_α(x)`.
#[derive(Debug, Clone)]
pub struct PAlpha {
    kind: KernelType,
    factor: f64,
}

impl PAlpha {
    pub fn new(alpha: u32) -> Result<Self, SearchError> {
        if !matches!(alpha, 2 | 4 | 6) {
            return Err(SearchError::configuration(format!(
                "P-alpha kernel requires alpha in {{2, 4, 6}}, got {}",
                alpha
            )));
        }
        let half = (alpha / 2) as i32;
        let factorial: f64 = (1..=alpha).map(f64::from).product();
        let factor = -(-4.0 * PI * PI).powi(half) / factorial;
        Ok(Self {
            kind: KernelType::PAlpha { alpha },
            factor,
        })
    }

    fn alpha(&self) -> u32 {
        match self.kind {
            KernelType::PAlpha { alpha } => alpha,
            _ => unreachable!("PAlpha.kind must be PAlpha"),
        }
    }
}

/// Bernoulli polynomial `B_α(x)` for even `α` up to 6.
fn bernoulli(alpha: u32, x: f64) -> f64 {
    let x2 = x * x;
    match alpha {
        2 => x2 - x + 1.0 / 6.0,
        4 => x2 * x2 - 2.0 * x2 * x + x2 - 1.0 / 30.0,
        6 => {
            let x4 = x2 * x2;
            x4 * x2 - 3.0 * x4 * x + 2.5 * x4 - 0.5 * x2 + 1.0 / 42.0
        }
        _ => unreachable!("unsupported Bernoulli order {}", alpha),
    }
}

impl Kernel for PAlpha {
    fn evaluate(&self, x: f64) -> f64 {
        self.factor * bernoulli(self.alpha(), x)
    }

    fn symmetric(&self) -> bool {
        true
    }

    fn name(&self) -> String {
        format!("P{}", self.alpha())
    }

    fn kind(&self) -> KernelType {
        self.kind
    }
}

/// `ω(x) = μ - (μ + 1) 2^((α-1)(⌊log2 x⌋ + 1))`, `ω(0) = μ`, with
/// `μ = 1 / (1 - 2^(1-α))`.
#[derive(Debug, Clone)]
pub struct PAlphaPlr {
    kind: KernelType,
    mu: f64,
}

impl PAlphaPlr {
    pub fn new(alpha: u32) -> Result<Self, SearchError> {
        if alpha < 2 {
            return Err(SearchError::configuration(format!(
                "P-alpha-PLR kernel requires alpha > 1, got {}",
                alpha
            )));
        }
        let mu = 1.0 / (1.0 - 2f64.powi(1 - alpha as i32));
        Ok(Self {
            kind: KernelType::PAlphaPlr { alpha },
            mu,
        })
    }

    fn alpha(&self) -> u32 {
        match self.kind {
            KernelType::PAlphaPlr { alpha } => alpha,
            _ => unreachable!("PAlphaPlr.kind must be PAlphaPlr"),
        }
    }
}

impl Kernel for PAlphaPlr {
    fn evaluate(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return self.mu;
        }
        let exponent = (self.alpha() as i32 - 1) * (x.log2().floor() as i32 + 1);
        self.mu - (self.mu + 1.0) * 2f64.powi(exponent)
    }

    fn symmetric(&self) -> bool {
        false
    }

    fn name(&self) -> String {
        format!("P{}-PLR", self.alpha())
    }

    fn kind(&self) -> KernelType {
        self.kind
    }
}

/// Interlaced `A_α` kernel with interlacing factor `d`, `m = min(α, d)`:
/// `ω(x) = (1 - (2^m - 1) 2^((m-1)⌊log2 x⌋)) / D` and `ω(0) = 1 / D`,
/// where `D = sqrt(2^(α+2)) (2^(m-1) - 1)`.
#[derive(Debug, Clone)]
pub struct IaAlpha {
    kind: KernelType,
    min: i32,
    denominator: f64,
}

impl IaAlpha {
    pub fn new(alpha: u32, interlacing: u32) -> Result<Self, SearchError> {
        if alpha < 2 {
            return Err(SearchError::configuration(
                "interlaced A-alpha kernel requires alpha > 1",
            ));
        }
        if interlacing < 2 {
            return Err(SearchError::configuration(
                "interlaced A-alpha kernel requires interlacing factor > 1",
            ));
        }
        let min = alpha.min(interlacing) as i32;
        let denominator = 2f64.powi(alpha as i32 + 2).sqrt() * (2f64.powi(min - 1) - 1.0);
        Ok(Self {
            kind: KernelType::IaAlpha { alpha, interlacing },
            min,
            denominator,
        })
    }
}

impl Kernel for IaAlpha {
    fn evaluate(&self, x: f64) -> f64 {
        if x < f64::EPSILON {
            return 1.0 / self.denominator;
        }
        let exponent = (self.min - 1) * x.log2().floor() as i32;
        (1.0 - (2f64.powi(self.min) - 1.0) * 2f64.powi(exponent)) / self.denominator
    }

    fn symmetric(&self) -> bool {
        false
    }

    fn name(&self) -> String {
        match self.kind {
            KernelType::IaAlpha { alpha, interlacing } => {
                format!("IA{} (interlacing {})", alpha, interlacing)
            }
            _ => unreachable!("IaAlpha.kind must be IaAlpha"),
        }
    }

    fn kind(&self) -> KernelType {
        self.kind
    }
}
