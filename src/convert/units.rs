//! Unit, sign and fixed-point conversions between the two document models.

use nalgebra::{Matrix3, Vector3};

use crate::source::SourceMatrix;
use crate::target::{BindingMatrix, TICKS_PER_SECOND, Tick, WEIGHT_MAX, WeightMap};

/// Converts a key time to target ticks, rounding to the nearest tick.
///
/// # Arguments
///
/// * `seconds` - Key time in seconds.
///
/// # Returns
///
/// Time in ticks of `1 / TICKS_PER_SECOND` seconds.
pub fn seconds_to_ticks(seconds: f64) -> Tick {
    (seconds * TICKS_PER_SECOND as f64).round() as Tick
}

/// Converts a percentage (`0..=100`) to a unit fraction (`0..=1`).
pub fn percent_to_fraction(percent: f64) -> f64 {
    percent * 0.01
}

/// Converts a unit weight to fixed point, clamping to `0..=1`.
pub fn weight_to_fixed(weight: f64) -> u16 {
    (weight.clamp(0.0, 1.0) * f64::from(WEIGHT_MAX)).round() as u16
}

/// Rebases a cluster's link matrix into the target binding convention.
///
/// # Arguments
///
/// * `link` - Global matrix of the bone at bind time, translation in row 3.
/// * `bone_origin` - Rest origin of the bound bone.
/// * `figure_origin` - Rest origin of the figure owning the skin binding.
///
/// # Returns
///
/// The upper 3x3 rows unchanged, and the negated translation row offset by
/// the bone's position relative to the figure.
pub fn binding_matrix(
    link: &SourceMatrix,
    bone_origin: &Vector3<f64>,
    figure_origin: &Vector3<f64>,
) -> BindingMatrix {
    let rows = &link.0;
    let rotation = Matrix3::new(
        rows[0][0], rows[0][1], rows[0][2], //
        rows[1][0], rows[1][1], rows[1][2], //
        rows[2][0], rows[2][1], rows[2][2],
    );
    let translation = -link.translation() + (bone_origin - figure_origin);

    BindingMatrix {
        rotation,
        translation,
    }
}

/// Normalizes raw per-bone weights into fixed-point maps.
///
/// # Arguments
///
/// * `raw` - One dense weight array per bone binding, each `vertex_count` long.
/// * `vertex_count` - Number of mesh vertices.
///
/// # Returns
///
/// One [`WeightMap`] per input array. At every vertex with a positive total
/// the fixed-point weights sum to exactly [`WEIGHT_MAX`]; the rounding
/// remainder goes to the largest weight. Vertices with no weight stay zero.
pub fn normalize_weights(raw: &[Vec<f64>], vertex_count: usize) -> Vec<WeightMap> {
    let mut maps: Vec<WeightMap> = raw.iter().map(|_| WeightMap::new(vertex_count)).collect();

    for vertex in 0..vertex_count {
        let weight_at = |weights: &Vec<f64>| weights.get(vertex).copied().unwrap_or(0.0).max(0.0);
        let sum: f64 = raw.iter().map(weight_at).sum();
        if sum <= 0.0 {
            continue;
        }

        let mut total: i64 = 0;
        let mut largest: Option<(usize, f64)> = None;
        for (map_index, weights) in raw.iter().enumerate() {
            let weight = weight_at(weights);
            let fixed = weight_to_fixed(weight / sum);
            maps[map_index].weights[vertex] = fixed;
            total += i64::from(fixed);
            if largest.is_none_or(|(_, best)| weight > best) {
                largest = Some((map_index, weight));
            }
        }

        let remainder = i64::from(WEIGHT_MAX) - total;
        if remainder != 0
            && let Some((map_index, _)) = largest
        {
            let slot = &mut maps[map_index].weights[vertex];
            *slot = (i64::from(*slot) + remainder).clamp(0, i64::from(WEIGHT_MAX)) as u16;
        }
    }

    maps
}

/// Builds the per-vertex linear/dual-quaternion blend map of a skin.
pub fn blend_weight_map(indices: &[usize], weights: &[f64], vertex_count: usize) -> WeightMap {
    let mut map = WeightMap::new(vertex_count);
    for (&vertex, &weight) in indices.iter().zip(weights) {
        if let Some(slot) = map.weights.get_mut(vertex) {
            *slot = weight_to_fixed(weight);
        }
    }
    map
}

/// Derives opacity from a transparency color, black being opaque.
pub fn opacity_from_transparency(color: &Vector3<f64>) -> f64 {
    1.0 - (color.x + color.y + color.z) / 3.0
}

/// Approximates PBR roughness from a Phong exponent.
///
/// This is a compatibility heuristic, not a physical conversion: exponent 4
/// maps to roughness 1 and every doubling lowers it by 0.1. The result is
/// kept in `0..=1`; exponents that are not positive give a fully rough
/// surface.
pub fn phong_roughness(shininess: f64) -> f64 {
    if shininess.is_nan() || shininess <= 0.0 {
        return 1.0;
    }
    (1.0 - (shininess.log2() - 2.0) / 10.0).clamp(0.0, 1.0)
}

/// Approximates metallicity from how tinted a specular color is.
///
/// Grey highlights read as dielectric, coloured ones as metal. Heuristic.
pub fn specular_metallicity(specular: &Vector3<f64>) -> f64 {
    let spread = (specular.y - specular.x).abs()
        + (specular.z - specular.x).abs()
        + (specular.z - specular.y).abs();
    spread.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_fractional_seconds_when_converting_then_ticks_round_to_nearest() {
        assert_eq!(seconds_to_ticks(0.0), 0);
        assert_eq!(seconds_to_ticks(1.0), 4800);
        assert_eq!(seconds_to_ticks(1.0 / 30.0), 160);
        assert_eq!(seconds_to_ticks(0.00011), 1);
    }

    #[test]
    fn given_percent_when_converting_then_fraction_is_returned() {
        assert!((percent_to_fraction(50.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn given_translated_link_when_rebasing_then_translation_is_negated_and_offset() {
        let link = SourceMatrix::from_translation(Vector3::new(0.0, 10.0, 0.0));
        let matrix = binding_matrix(
            &link,
            &Vector3::new(0.0, 10.0, 0.0),
            &Vector3::new(0.0, 2.0, 0.0),
        );

        assert_eq!(matrix.rotation, Matrix3::identity());
        assert!((matrix.translation - Vector3::new(0.0, -2.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn given_three_equal_weights_when_normalizing_then_sum_is_exactly_max() {
        let raw = vec![vec![0.2, 0.0], vec![0.2, 0.0], vec![0.2, 0.0]];
        let maps = normalize_weights(&raw, 2);

        let total: u32 = maps.iter().map(|map| u32::from(map.get(0))).sum();
        assert_eq!(total, u32::from(WEIGHT_MAX));
        for map in &maps {
            assert!(map.get(0) >= 21844 && map.get(0) <= 21846);
            assert_eq!(map.get(1), 0);
        }
    }

    #[test]
    fn given_single_partial_weight_when_normalizing_then_it_becomes_full() {
        let maps = normalize_weights(&[vec![0.25]], 1);
        assert_eq!(maps[0].get(0), WEIGHT_MAX);
    }

    #[test]
    fn given_blend_weights_when_mapping_then_out_of_range_vertices_are_ignored() {
        let map = blend_weight_map(&[0, 5], &[0.5, 1.0], 2);
        assert_eq!(map.weights, vec![32768, 0]);
    }

    #[test]
    fn given_out_of_range_shininess_when_approximating_roughness_then_result_is_clamped() {
        assert_eq!(phong_roughness(0.0), 1.0);
        assert_eq!(phong_roughness(-3.0), 1.0);
        assert_eq!(phong_roughness(f64::NAN), 1.0);
        assert_eq!(phong_roughness(1.0), 1.0);
        assert_eq!(phong_roughness(4.0), 1.0);
        assert_eq!(phong_roughness(8192.0), 0.0);
    }

    #[test]
    fn given_phong_values_when_approximating_pbr_then_heuristics_match() {
        assert!((phong_roughness(4.0) - 1.0).abs() < 1e-12);
        assert!((phong_roughness(64.0) - 0.6).abs() < 1e-12);
        assert_eq!(specular_metallicity(&Vector3::new(0.5, 0.5, 0.5)), 0.0);
        assert_eq!(specular_metallicity(&Vector3::new(1.0, 0.0, 0.0)), 1.0);
        assert!((opacity_from_transparency(&Vector3::new(0.3, 0.3, 0.3)) - 0.7).abs() < 1e-12);
    }
}
