//! Coordinate arguments
//!
//! Each component is either absolute (`12.5`) or relative to the caller (`~`, `~-3`). Trailing
//! commas are ignored so coordinates copied from chat lines paste cleanly.

use glam::DVec3;

use crate::error::{LibraryError, LibraryResult};
use crate::world::Position;

/// Resolve each argument against the matching component of `origin`
fn parse_components(args: &[&str], origin: &[f64]) -> LibraryResult<Vec<f64>> {
    args.iter()
        .zip(origin)
        .map(|(raw, base)| {
            let cleaned = raw.replace(',', "");
            let value = match cleaned.strip_prefix('~') {
                // a bare or unreadable offset counts as zero
                Some(offset) => base + offset.parse::<f64>().unwrap_or(0.0),
                None => cleaned.parse::<f64>().unwrap_or(f64::NAN),
            };
            if value.is_finite() {
                Ok(value)
            } else {
                Err(LibraryError::MalformedCoordinates {
                    input: args.join(" "),
                })
            }
        })
        .collect()
}

/// `<x> <y> <z>`
pub fn parse_point(args: &[&str], origin: &Position) -> LibraryResult<DVec3> {
    if args.len() != 3 {
        return Err(LibraryError::MalformedCoordinates {
            input: args.join(" "),
        });
    }
    let coords = origin.coords;
    let values = parse_components(args, &[coords.x, coords.y, coords.z])?;
    Ok(DVec3::new(values[0], values[1], values[2]))
}

/// `<x> <y> <z> [<yaw> <pitch>]`. Orientation defaults to zero.
pub fn parse_position(args: &[&str], origin: &Position) -> LibraryResult<Position> {
    if args.len() != 3 && args.len() != 5 {
        return Err(LibraryError::MalformedCoordinates {
            input: args.join(" "),
        });
    }
    let coords = origin.coords;
    let values = parse_components(
        args,
        &[
            coords.x,
            coords.y,
            coords.z,
            f64::from(origin.yaw),
            f64::from(origin.pitch),
        ],
    )?;

    let mut position = Position::new(DVec3::new(values[0], values[1], values[2]), 0.0, 0.0);
    if values.len() == 5 {
        position.yaw = values[3] as f32;
        position.pitch = values[4] as f32;
    }
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Position {
        Position::new(DVec3::new(100.0, 20.0, -50.0), 90.0, 10.0)
    }

    #[test]
    fn test_absolute_point() {
        let point = parse_point(&["1", "2.5", "-3"], &origin()).unwrap();
        assert_eq!(point, DVec3::new(1.0, 2.5, -3.0));
    }

    #[test]
    fn test_relative_components() {
        let point = parse_point(&["~", "~5", "~-10"], &origin()).unwrap();
        assert_eq!(point, DVec3::new(100.0, 25.0, -60.0));
    }

    #[test]
    fn test_commas_are_stripped() {
        let point = parse_point(&["1,000,", "2,", "3"], &origin()).unwrap();
        assert_eq!(point, DVec3::new(1000.0, 2.0, 3.0));
    }

    #[test]
    fn test_position_with_orientation() {
        let position = parse_position(&["0", "1", "2", "~", "45"], &origin()).unwrap();
        assert_eq!(position.coords, DVec3::new(0.0, 1.0, 2.0));
        assert_eq!(position.yaw, 90.0);
        assert_eq!(position.pitch, 45.0);

        let position = parse_position(&["0", "1", "2"], &origin()).unwrap();
        assert_eq!(position.yaw, 0.0);
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            parse_point(&["a", "1", "2"], &origin()).unwrap_err(),
            LibraryError::MalformedCoordinates { .. }
        ));
        assert!(parse_point(&["NaN", "1", "2"], &origin()).is_err());
        assert!(parse_position(&["1", "2", "3", "4"], &origin()).is_err());
    }
}
