//! Transmon circuit physics: closed-form conversions and the charge-basis
//! diagonalization behind qubit frequency and anharmonicity.
//!
//! Frequencies are in GHz, anharmonicities in MHz, capacitances in fF,
//! inductances in nH, unless a name says otherwise.

use crate::dedupe::{broadcast_unique, round_to_digits, MemoCache};
use hspace_core::{Error, Result};
use nalgebra::{DMatrix, SymmetricEigen};
use parking_lot::Mutex;
use std::f64::consts::PI;
use tracing::debug;

/// Elementary charge [C].
pub const E_CHARGE: f64 = 1.602176634e-19;
/// Planck constant [J s].
pub const PLANCK: f64 = 6.62607015e-34;
/// Reduced Planck constant [J s].
pub const HBAR: f64 = PLANCK / (2.0 * PI);
/// Reduced flux quantum hbar / 2e [Wb].
pub const PHI0_REDUCED: f64 = HBAR / (2.0 * E_CHARGE);

/// Default characteristic impedance of the readout line [Ohm].
pub const Z0_DEFAULT: f64 = 50.0;

/// Charging energy [GHz] from a shunt capacitance [fF].
#[inline]
pub fn ec_from_cs(cs_ff: f64) -> f64 {
    let cs = cs_ff * 1e-15;
    (E_CHARGE * E_CHARGE) / (2.0 * cs) / PLANCK * 1e-9
}

/// Effective charging energy [GHz] of a cross qubit from its simulated
/// cross-to-claw and cross-to-ground capacitances [fF]. Capacitance-matrix
/// off-diagonal entries are negative; magnitudes are what load the island.
#[inline]
pub fn effective_ec(cross_to_claw: f64, cross_to_ground: f64) -> f64 {
    ec_from_cs(cross_to_claw.abs() + cross_to_ground.abs())
}

/// Junction inductance [nH] from Josephson energy [GHz].
#[inline]
pub fn lj_from_ej(ej_ghz: f64) -> f64 {
    let ej_joule = ej_ghz * 1e9 * PLANCK;
    PHI0_REDUCED * PHI0_REDUCED / ej_joule * 1e9
}

/// Josephson energy [GHz] from junction inductance [nH].
#[inline]
pub fn ej_from_lj(lj_nh: f64) -> f64 {
    let lj = lj_nh * 1e-9;
    PHI0_REDUCED * PHI0_REDUCED / lj / PLANCK * 1e-9
}

/// Three lowest eigenenergies [GHz] of the transmon charge-basis
/// Hamiltonian `4 EC (n - ng)^2 - (EJ/2)(|n><n+1| + h.c.)` truncated at
/// `ncut` charge states.
pub fn charge_basis_levels(ej: f64, ec: f64, ng: f64, ncut: usize) -> [f64; 3] {
    let dim = 2 * ncut + 1;
    let mut hamiltonian = DMatrix::<f64>::zeros(dim, dim);
    for i in 0..dim {
        let n = i as f64 - ncut as f64;
        hamiltonian[(i, i)] = 4.0 * ec * (n - ng) * (n - ng);
    }
    for i in 0..dim - 1 {
        hamiltonian[(i, i + 1)] = -ej / 2.0;
        hamiltonian[(i + 1, i)] = -ej / 2.0;
    }
    let eigen = SymmetricEigen::new(hamiltonian);
    let mut levels: Vec<f64> = eigen.eigenvalues.iter().copied().collect();
    levels.sort_by(|a, b| a.total_cmp(b));
    [levels[0], levels[1], levels[2]]
}

/// Coupling strength g [MHz] between a transmon and a resonator from the
/// capacitance matrix.
///
/// `mode_factor` encodes the resonator mode structure (4 for quarter-wave,
/// 2 for half-wave) and always comes from the registered scaling rules of
/// the topology at hand; passing one topology's factor for another
/// silently skews every coupling estimate.
pub fn g_from_cap_matrix(
    c_ff: f64,
    c_c_ff: f64,
    ej_ghz: f64,
    f_r_ghz: f64,
    mode_factor: f64,
    z0: f64,
) -> f64 {
    let c = c_ff.abs() * 1e-15;
    let c_c = c_c_ff.abs() * 1e-15;
    let c_q = c + c_c;
    let omega_r = 2.0 * PI * f_r_ghz * 1e9;
    let ec = (E_CHARGE * E_CHARGE) / (2.0 * c_q) / PLANCK * 1e-9;
    let prefactor = (mode_factor * z0 * E_CHARGE * E_CHARGE / (HBAR * PI)).sqrt();
    let g = (c_c / c_q) * omega_r * prefactor * (ej_ghz / (8.0 * ec)).powf(0.25);
    g * 1e-6 / (2.0 * PI)
}

/// Full dispersive shift of the cavity [MHz] between the qubit |0> and |1>
/// states, from 2nd-order perturbation theory.
pub fn chi(ej: f64, ec: f64, g_mhz: f64, f_r_ghz: f64) -> f64 {
    let levels = charge_basis_levels(ej, ec, 0.0, NCUT_DEFAULT);
    let f_q = (levels[1] - levels[0]) * 1e3; // MHz
    let alpha = (levels[2] - 2.0 * levels[1] + levels[0]) * 1e3; // MHz
    let f_r = f_r_ghz * 1e3;
    let delta = f_r - f_q;
    let sigma = f_r + f_q;
    2.0 * g_mhz * g_mhz * (alpha / (delta * (delta - alpha)) - alpha / (sigma * (sigma + alpha)))
}

/// Capacitive-loading correction for interdigital-coupler (half-wave)
/// cavities: re-estimate the resonant frequency and kappa from the
/// coupler's top-to-ground and top-to-bottom capacitances [fF].
///
/// Input and output frequencies are in Hz.
pub fn update_cavity_frequency_and_kappa(
    cavity_frequency_hz: f64,
    top_to_ground_ff: f64,
    top_to_bottom_ff: f64,
    z0: f64,
) -> (f64, f64) {
    let omega_rough = 2.0 * PI * cavity_frequency_hz;
    let c_res = PI / (2.0 * omega_rough * z0) * 1e15; // fF
    let c_total = c_res + top_to_ground_ff + top_to_bottom_ff;
    let omega_est = (c_res / c_total).sqrt() * omega_rough;
    let kappa = 0.5 * z0 * omega_est * omega_est * (top_to_bottom_ff * top_to_bottom_ff / c_total)
        * 1e-15;
    (omega_est / (2.0 * PI), kappa / (2.0 * PI))
}

/// Default charge-basis truncation, matching the library's simulated data.
pub const NCUT_DEFAULT: usize = 30;

/// Invert `(f01, anharmonicity)` to `(EJ, EC)` [GHz] by fixed-point
/// refinement against the exact diagonalization.
///
/// `alpha_ghz` is the anharmonicity in GHz; its sign is ignored (a transmon
/// anharmonicity is negative).
pub fn find_ej_ec(f01_ghz: f64, alpha_ghz: f64) -> Result<(f64, f64)> {
    if !f01_ghz.is_finite() || f01_ghz <= 0.0 {
        return Err(Error::NonFinite {
            what: "qubit frequency",
            value: f01_ghz,
        });
    }
    if !alpha_ghz.is_finite() || alpha_ghz == 0.0 {
        return Err(Error::NonFinite {
            what: "anharmonicity",
            value: alpha_ghz,
        });
    }
    let alpha_target = -alpha_ghz.abs();

    // Transmon-limit seed: f01 ~ sqrt(8 EJ EC) - EC, alpha ~ -EC.
    let mut ec = alpha_target.abs();
    let mut ej = (f01_ghz + ec).powi(2) / (8.0 * ec);
    let tol = 1e-9 * f01_ghz.max(1.0);

    for iteration in 0..60 {
        let levels = charge_basis_levels(ej, ec, 0.0, NCUT_DEFAULT);
        let f01_model = levels[1] - levels[0];
        let alpha_model = levels[2] - 2.0 * levels[1] + levels[0];
        if (f01_model - f01_ghz).abs() < tol && (alpha_model - alpha_target).abs() < tol {
            debug!(iteration, ej, ec, "EJ/EC inversion converged");
            break;
        }
        // Anharmonicity tracks EC and, with EC fixed, f01 + EC tracks
        // sqrt(8 EJ EC); each correction is exact to first order.
        ec *= alpha_target / alpha_model;
        ej *= ((f01_ghz + ec) / (f01_model + ec)).powi(2);
    }
    Ok((ej, ec))
}

/// Transmon model with an explicit, bounded memoization cache for the
/// diagonalization step.
///
/// The cache is owned here rather than living in ambient process state, so
/// independent models (and independent tests) never share results. The
/// model is `Sync`: concurrent queries serialize only on the cache lock.
pub struct TransmonModel {
    ncut: usize,
    z0: f64,
    /// Rounding applied to EJ/EC before caching and deduplication.
    round_digits: i32,
    cache: Mutex<MemoCache>,
}

impl Default for TransmonModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TransmonModel {
    pub const DEFAULT_CACHE_CAPACITY: usize = 4096;
    pub const DEFAULT_ROUND_DIGITS: i32 = 6;

    #[must_use]
    pub fn new() -> Self {
        Self {
            ncut: NCUT_DEFAULT,
            z0: Z0_DEFAULT,
            round_digits: Self::DEFAULT_ROUND_DIGITS,
            cache: Mutex::new(MemoCache::new(Self::DEFAULT_CACHE_CAPACITY)),
        }
    }

    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = Mutex::new(MemoCache::new(capacity));
        self
    }

    #[must_use]
    pub fn with_round_digits(mut self, digits: i32) -> Self {
        self.round_digits = digits;
        self
    }

    #[must_use]
    pub fn with_z0(mut self, z0: f64) -> Self {
        self.z0 = z0;
        self
    }

    pub fn z0(&self) -> f64 {
        self.z0
    }

    pub fn round_digits(&self) -> i32 {
        self.round_digits
    }

    /// `(f01 [GHz], anharmonicity [MHz])` for one `(EJ, EC)` pair, through
    /// the memo cache.
    pub fn e01_and_anharmonicity(&self, ej: f64, ec: f64) -> (f64, f64) {
        let key_ej = round_to_digits(ej, self.round_digits);
        let key_ec = round_to_digits(ec, self.round_digits);
        self.cache
            .lock()
            .get_or_insert_with(key_ej, key_ec, || diagonalize(key_ej, key_ec, self.ncut))
    }

    /// Bulk `(f01, anharmonicity)` over many charging energies sharing one
    /// EJ: deduplicate the rounded ECs, diagonalize once per distinct
    /// value, broadcast back in row order.
    pub fn e01_and_anharmonicity_bulk(&self, ej: f64, ecs: &[f64]) -> Vec<(f64, f64)> {
        let key_ej = round_to_digits(ej, self.round_digits);
        let mut cache = self.cache.lock();
        let ncut = self.ncut;
        broadcast_unique(ecs, self.round_digits, |ec| {
            cache.get_or_insert_with(key_ej, ec, || diagonalize(key_ej, ec, ncut))
        })
    }

    /// `(hits, misses, resident entries)` of the memo cache.
    pub fn cache_stats(&self) -> (u64, u64, usize) {
        let cache = self.cache.lock();
        (cache.hits(), cache.misses(), cache.len())
    }
}

impl std::fmt::Debug for TransmonModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransmonModel")
            .field("ncut", &self.ncut)
            .field("z0", &self.z0)
            .field("round_digits", &self.round_digits)
            .finish()
    }
}

fn diagonalize(ej: f64, ec: f64, ncut: usize) -> (f64, f64) {
    let levels = charge_basis_levels(ej, ec, 0.0, ncut);
    let f01 = levels[1] - levels[0];
    let alpha_mhz = (levels[2] - 2.0 * levels[1] + levels[0]) * 1e3;
    (f01, alpha_mhz)
}
