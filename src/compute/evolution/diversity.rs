//! Population diversity via the Grefenstette bias.

use crate::schema::{Circle, GeneBias};

/// Grefenstette bias per gene parameter.
///
/// Each parameter is min-max normalized per gene slot across the population
/// (a slot with no spread normalizes to 1). Results lie in `[0, 1]`; values near
/// 1 mean the population is diverse in that parameter.
pub fn grefenstette_bias<C: AsRef<[Circle]>>(population: &[C]) -> GeneBias {
    let genes = population.first().map_or(0, |c| c.as_ref().len());
    if genes == 0 {
        return GeneBias::default();
    }

    let mut components = [0.0f64; 3];
    for slot in 0..genes {
        let values: Vec<[f32; 3]> = population
            .iter()
            .filter_map(|c| c.as_ref().get(slot))
            .map(|g| [g.radius, g.angular_velocity.nominal(), g.initial_phase])
            .collect();

        for (param, component) in components.iter_mut().enumerate() {
            let (min, max) = values
                .iter()
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v[param]), hi.max(v[param]))
                });

            let (mut sum, mut sum_inv) = (0.0f64, 0.0f64);
            for v in &values {
                let norm = if max > min {
                    ((v[param] - min) / (max - min)) as f64
                } else {
                    1.0
                };
                sum += norm;
                sum_inv += 1.0 - norm;
            }
            *component += sum.max(sum_inv);
        }
    }

    let total = (population.len() * genes) as f64;
    let bias = |component: f64| (2.0 * (1.0 - component / total)) as f32;
    GeneBias {
        radius: bias(components[0]),
        angular_velocity: bias(components[1]),
        phase: bias(components[2]),
    }
}
