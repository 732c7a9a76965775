use crate::dynamics::state::G0;

// ---------------------------------------------------------------------------
// ISA 1976 standard atmosphere, table driven
// ---------------------------------------------------------------------------

const R_AIR: f64 = 287.052_87; // J/(kg·K)
const GAMMA: f64 = 1.4;

/// Base of one atmospheric layer: (base altitude m, base temperature K,
/// lapse rate K/m, base pressure Pa).
const LAYERS: [(f64, f64, f64, f64); 7] = [
    (0.0, 288.15, -0.0065, 101_325.0),
    (11_000.0, 216.65, 0.0, 22_632.1),
    (20_000.0, 216.65, 0.001, 5_474.89),
    (32_000.0, 228.65, 0.0028, 868.019),
    (47_000.0, 270.65, 0.0, 110.906),
    (51_000.0, 270.65, -0.0028, 66.9389),
    (71_000.0, 214.65, -0.002, 3.956_42),
];

const TOP_OF_TABLE: f64 = 86_000.0;

/// Atmospheric properties at a geometric altitude.
#[derive(Debug, Clone, Copy)]
pub struct Atmo {
    pub density: f64,     // kg/m^3
    pub pressure: f64,    // Pa
    pub temperature: f64, // K
    pub sound_speed: f64, // m/s
}

/// ISA 1976 up to 86 km, exponential tail above.
pub fn isa(altitude_m: f64) -> Atmo {
    let h = altitude_m.max(0.0);

    let (temperature, pressure) = if h >= TOP_OF_TABLE {
        (186.87, (0.3734 * (-0.000_15 * (h - TOP_OF_TABLE)).exp()).max(0.0))
    } else {
        let &(h_base, t_base, lapse, p_base) = LAYERS
            .iter()
            .rev()
            .find(|layer| h >= layer.0)
            .unwrap_or(&LAYERS[0]);
        layer_state(h - h_base, t_base, lapse, p_base)
    };

    let density = if temperature > 0.0 {
        pressure / (R_AIR * temperature)
    } else {
        0.0
    };

    Atmo {
        density,
        pressure,
        temperature,
        sound_speed: (GAMMA * R_AIR * temperature).sqrt(),
    }
}

/// Density only; the hot path of the aero cache needs nothing else.
pub fn density(altitude_m: f64) -> f64 {
    isa(altitude_m).density
}

fn layer_state(dh: f64, t_base: f64, lapse: f64, p_base: f64) -> (f64, f64) {
    if lapse == 0.0 {
        (t_base, p_base * ((-G0 / (R_AIR * t_base)) * dh).exp())
    } else {
        let t = t_base + lapse * dh;
        (t, p_base * (t / t_base).powf(-G0 / (lapse * R_AIR)))
    }
}
