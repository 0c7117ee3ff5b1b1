//! Matrix-level transform application.
//!
//! Events arrive as an `n_events x n_channels` matrix. Every operation
//! reads the pristine input columns and writes into a copy, so the
//! untouched channels survive bit for bit and repeating an index in the
//! selection is harmless: the repeat reads the same original column and
//! writes the same result.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::ScaleTransform;
use crate::asinh::Asinh;
use crate::config::TransformConfig;
use crate::error::{Result, TransformError};
use crate::hyperlog::Hyperlog;
use crate::logarithmic::Logarithmic;
use crate::logicle::Logicle;
use crate::params::{AsinhParams, BiexpParams, LogParams, WidthSpec};

/// Which channels of the event matrix an operation touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelSelection {
    /// Every channel
    All,
    /// Channels by column index
    Indices(Vec<usize>),
}

impl ChannelSelection {
    fn resolve(&self, n_channels: usize) -> Result<Vec<usize>> {
        match self {
            ChannelSelection::All => Ok((0..n_channels).collect()),
            ChannelSelection::Indices(indices) => {
                for &index in indices {
                    if index >= n_channels {
                        return Err(TransformError::ChannelOutOfBounds { index, n_channels });
                    }
                }
                Ok(indices.clone())
            }
        }
    }
}

impl From<Vec<usize>> for ChannelSelection {
    fn from(indices: Vec<usize>) -> Self {
        ChannelSelection::Indices(indices)
    }
}

/// Transform family selector, parseable from its lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Family {
    Logicle,
    Hyperlog,
    Asinh,
    Log,
}

/// A transform family paired with its parameters, ready to apply to a
/// matrix in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Transform {
    Logicle(BiexpParams),
    Hyperlog(BiexpParams),
    Asinh(AsinhParams),
    Log(LogParams),
}

impl Transform {
    /// The family this parameter set belongs to.
    pub fn family(&self) -> Family {
        match self {
            Transform::Logicle(_) => Family::Logicle,
            Transform::Hyperlog(_) => Family::Hyperlog,
            Transform::Asinh(_) => Family::Asinh,
            Transform::Log(_) => Family::Log,
        }
    }

    /// Scales the selected channels of `events`.
    pub fn apply(
        &self,
        events: &Array2<f64>,
        channels: &ChannelSelection,
        config: TransformConfig,
    ) -> Result<Array2<f64>> {
        match *self {
            Transform::Logicle(params) => logicle(events, channels, params, config),
            Transform::Hyperlog(params) => hyperlog(events, channels, params, config),
            Transform::Asinh(params) => asinh(events, channels, params, config),
            Transform::Log(params) => log(events, channels, params, config),
        }
    }

    /// Maps the selected channels of `events` back to channel units.
    pub fn apply_inverse(
        &self,
        events: &Array2<f64>,
        channels: &ChannelSelection,
        config: TransformConfig,
    ) -> Result<Array2<f64>> {
        match *self {
            Transform::Logicle(params) => logicle_inverse(events, channels, params, config),
            Transform::Hyperlog(params) => hyperlog_inverse(events, channels, params, config),
            Transform::Asinh(params) => asinh_inverse(events, channels, params, config),
            Transform::Log(params) => log_inverse(events, channels, params, config),
        }
    }
}

/// Applies `op` to each selected column of the pristine input, writing
/// results into a copy of the matrix.
fn apply_columns<F>(
    events: &Array2<f64>,
    channels: &ChannelSelection,
    mut op: F,
) -> Result<Array2<f64>>
where
    F: FnMut(&[f64]) -> Result<Vec<f64>>,
{
    let resolved = channels.resolve(events.ncols())?;
    let mut output = events.clone();
    for index in resolved {
        let column = events.column(index).to_vec();
        let mapped = op(&column)?;
        for (slot, value) in output.column_mut(index).iter_mut().zip(mapped) {
            *slot = value;
        }
    }
    Ok(output)
}

/// Scales the selected channels with an already constructed transform.
///
/// The named per-family operations cover the common cases; this is the
/// entry point for callers holding a transform value of their own, shared
/// across calls or behind `dyn ScaleTransform`.
pub fn transform_matrix<T>(
    events: &Array2<f64>,
    channels: &ChannelSelection,
    transform: &T,
) -> Result<Array2<f64>>
where
    T: ScaleTransform + ?Sized,
{
    apply_columns(events, channels, |column| transform.scale_all(column))
}

/// Maps the selected channels back to channel units with an already
/// constructed transform.
pub fn inverse_matrix<T>(
    events: &Array2<f64>,
    channels: &ChannelSelection,
    transform: &T,
) -> Result<Array2<f64>>
where
    T: ScaleTransform + ?Sized,
{
    apply_columns(events, channels, |column| Ok(transform.inverse_all(column)))
}

/// Logicle-scales the selected channels.
///
/// A [`WidthSpec::FromQuantile`] width is resolved against each channel's
/// own negative population, so every selected channel gets its own
/// derivation.
pub fn logicle(
    events: &Array2<f64>,
    channels: &ChannelSelection,
    params: BiexpParams,
    config: TransformConfig,
) -> Result<Array2<f64>> {
    if matches!(params.width, WidthSpec::FromQuantile(_)) {
        return apply_columns(events, channels, |column| {
            Logicle::for_data(params, column, config)?.scale_all(column)
        });
    }
    transform_matrix(events, channels, &Logicle::with_config(params, config)?)
}

/// Inverts logicle-scaled channels back to channel units.
///
/// Data-derived widths cannot be resolved here and are rejected; the
/// scaled matrix no longer carries the negative population the width was
/// estimated from.
pub fn logicle_inverse(
    events: &Array2<f64>,
    channels: &ChannelSelection,
    params: BiexpParams,
    config: TransformConfig,
) -> Result<Array2<f64>> {
    inverse_matrix(events, channels, &Logicle::with_config(params, config)?)
}

/// Hyperlog-scales the selected channels, with the same per-channel width
/// handling as [`logicle`].
pub fn hyperlog(
    events: &Array2<f64>,
    channels: &ChannelSelection,
    params: BiexpParams,
    config: TransformConfig,
) -> Result<Array2<f64>> {
    if matches!(params.width, WidthSpec::FromQuantile(_)) {
        return apply_columns(events, channels, |column| {
            Hyperlog::for_data(params, column, config)?.scale_all(column)
        });
    }
    transform_matrix(events, channels, &Hyperlog::with_config(params, config)?)
}

/// Inverts hyperlog-scaled channels back to channel units.
pub fn hyperlog_inverse(
    events: &Array2<f64>,
    channels: &ChannelSelection,
    params: BiexpParams,
    config: TransformConfig,
) -> Result<Array2<f64>> {
    inverse_matrix(events, channels, &Hyperlog::with_config(params, config)?)
}

/// Asinh-scales the selected channels.
pub fn asinh(
    events: &Array2<f64>,
    channels: &ChannelSelection,
    params: AsinhParams,
    config: TransformConfig,
) -> Result<Array2<f64>> {
    transform_matrix(events, channels, &Asinh::with_config(params, config)?)
}

/// Inverts asinh-scaled channels back to channel units.
pub fn asinh_inverse(
    events: &Array2<f64>,
    channels: &ChannelSelection,
    params: AsinhParams,
    config: TransformConfig,
) -> Result<Array2<f64>> {
    inverse_matrix(events, channels, &Asinh::with_config(params, config)?)
}

/// Log-scales the selected channels.
pub fn log(
    events: &Array2<f64>,
    channels: &ChannelSelection,
    params: LogParams,
    config: TransformConfig,
) -> Result<Array2<f64>> {
    transform_matrix(events, channels, &Logarithmic::with_config(params, config)?)
}

/// Inverts log-scaled channels back to channel units.
pub fn log_inverse(
    events: &Array2<f64>,
    channels: &ChannelSelection,
    params: LogParams,
    config: TransformConfig,
) -> Result<Array2<f64>> {
    inverse_matrix(events, channels, &Logarithmic::with_config(params, config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    fn sample_events() -> Array2<f64> {
        arr2(&[
            [12.0, -3.0, 100.0],
            [0.5, 40.0, -8.0],
            [900.0, 7.5, 0.0],
            [-20.0, 0.0, 55.0],
        ])
    }

    fn biexp_params() -> BiexpParams {
        BiexpParams::new(1000.0, 4.0, 1.0, 0.0)
    }

    #[test]
    fn test_untouched_channels_survive_bit_for_bit() {
        let events = sample_events();
        let out = logicle(
            &events,
            &ChannelSelection::Indices(vec![1]),
            biexp_params(),
            TransformConfig::default(),
        )
        .unwrap();
        assert_eq!(events.column(0), out.column(0));
        assert_eq!(events.column(2), out.column(2));
        assert_ne!(events.column(1), out.column(1));
    }

    #[test]
    fn test_all_selects_every_channel() {
        let events = sample_events();
        let all = logicle(
            &events,
            &ChannelSelection::All,
            biexp_params(),
            TransformConfig::default(),
        )
        .unwrap();
        let by_index = logicle(
            &events,
            &vec![0, 1, 2].into(),
            biexp_params(),
            TransformConfig::default(),
        )
        .unwrap();
        assert_eq!(all, by_index);
    }

    #[test]
    fn test_duplicate_indices_are_harmless() {
        let events = sample_events();
        let once = hyperlog(
            &events,
            &ChannelSelection::Indices(vec![2]),
            biexp_params(),
            TransformConfig::default(),
        )
        .unwrap();
        let twice = hyperlog(
            &events,
            &ChannelSelection::Indices(vec![2, 2]),
            biexp_params(),
            TransformConfig::default(),
        )
        .unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_out_of_bounds_index_is_reported() {
        let events = sample_events();
        let result = asinh(
            &events,
            &ChannelSelection::Indices(vec![0, 3]),
            AsinhParams::default(),
            TransformConfig::default(),
        );
        assert!(matches!(
            result,
            Err(TransformError::ChannelOutOfBounds { index: 3, n_channels: 3 })
        ));
    }

    #[test]
    fn test_quantile_width_is_per_channel() {
        // Channel 0 has a deep negative tail, channel 1 a shallower one
        let events = arr2(&[
            [-120.0, -25.0],
            [30.0, 18.0],
            [500.0, 420.0],
            [-60.0, -0.5],
            [9.0, 3.3],
        ]);
        let params = BiexpParams {
            width: WidthSpec::FromQuantile(0.05),
            ..BiexpParams::default()
        };
        let config = TransformConfig::default();
        let out = logicle(&events, &ChannelSelection::All, params, config).unwrap();

        for channel in 0..2 {
            let column = events.column(channel).to_vec();
            let expected = Logicle::for_data(params, &column, config)
                .unwrap()
                .scale_all(&column)
                .unwrap();
            for (row, &want) in expected.iter().enumerate() {
                assert_relative_eq!(out[[row, channel]], want);
            }
        }

        let w0 = Logicle::for_data(params, &events.column(0).to_vec(), config)
            .unwrap()
            .width();
        let w1 = Logicle::for_data(params, &events.column(1).to_vec(), config)
            .unwrap()
            .width();
        assert!(w0 != w1);
    }

    #[test]
    fn test_inverse_rejects_data_derived_width() {
        let events = sample_events();
        let params = BiexpParams {
            width: WidthSpec::FromQuantile(0.05),
            ..BiexpParams::default()
        };
        let result = logicle_inverse(
            &events,
            &ChannelSelection::All,
            params,
            TransformConfig::default(),
        );
        assert!(matches!(result, Err(TransformError::InvalidParameters(_))));
    }

    #[test]
    fn test_matrix_application_of_shared_transform() {
        let events = sample_events();
        let transform = Logicle::new(biexp_params()).unwrap();
        let scaled = transform_matrix(&events, &ChannelSelection::All, &transform).unwrap();
        let direct = logicle(
            &events,
            &ChannelSelection::All,
            biexp_params(),
            TransformConfig::default(),
        )
        .unwrap();
        assert_eq!(scaled, direct);

        // The trait is object safe, so a type-erased transform works too
        let dynamic: &dyn ScaleTransform = &transform;
        assert_eq!(
            transform_matrix(&events, &ChannelSelection::All, dynamic).unwrap(),
            scaled
        );

        let back = inverse_matrix(&scaled, &ChannelSelection::All, &transform).unwrap();
        for (&original, &round) in events.iter().zip(back.iter()) {
            assert_relative_eq!(round, original, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_transform_enum_matches_free_functions() {
        let events = sample_events();
        let config = TransformConfig::default();
        let transform = Transform::Hyperlog(biexp_params());
        assert_eq!(transform.family(), Family::Hyperlog);

        let via_enum = transform
            .apply(&events, &ChannelSelection::All, config)
            .unwrap();
        let via_fn = hyperlog(&events, &ChannelSelection::All, biexp_params(), config).unwrap();
        assert_eq!(via_enum, via_fn);

        let back = transform
            .apply_inverse(&via_enum, &ChannelSelection::All, config)
            .unwrap();
        for (&original, &round) in events.iter().zip(back.iter()) {
            assert_relative_eq!(round, original, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_family_names_round_trip() {
        assert_eq!("logicle".parse::<Family>().unwrap(), Family::Logicle);
        assert_eq!("hyperlog".parse::<Family>().unwrap(), Family::Hyperlog);
        assert_eq!(Family::Asinh.to_string(), "asinh");
        assert_eq!(Family::Log.to_string(), "log");
        assert!("biexp".parse::<Family>().is_err());
    }

    #[test]
    fn test_empty_matrix_passes_through() {
        let events = Array2::<f64>::zeros((0, 3));
        let out = log(
            &events,
            &ChannelSelection::All,
            LogParams::default(),
            TransformConfig::default(),
        )
        .unwrap();
        assert_eq!(out.nrows(), 0);
        assert_eq!(out.ncols(), 3);
    }
}
