//! Which chunk columns a viewer needs after a teleport or a chunk crossing

use crate::world::ChunkColumn;

/// Radius of the area sent after a teleport
const TELEPORT_RADIUS: i32 = 2;

/// 5×5 columns around `center` without the four corners
pub fn teleport_neighborhood(center: ChunkColumn) -> Vec<ChunkColumn> {
    let mut columns = Vec::with_capacity(21);
    for dx in -TELEPORT_RADIUS..=TELEPORT_RADIUS {
        for dz in -TELEPORT_RADIUS..=TELEPORT_RADIUS {
            if dx.abs() + dz.abs() == 2 * TELEPORT_RADIUS {
                continue;
            }
            columns.push(center.offset(dx, dz));
        }
    }
    columns
}

/// Columns that come into view when moving from `previous` into `current`.
///
/// Each axis is handled on its own: the three columns one step past `current` in the direction of
/// travel, plus the column two steps past it when travel is negative. Library walls sit on a
/// chunk's positive edge, so without that extra column the far wall would be missing.
pub fn leading_edge(previous: ChunkColumn, current: ChunkColumn) -> Vec<ChunkColumn> {
    let mut columns = Vec::with_capacity(8);

    let step_x = current.x.cmp(&previous.x) as i32;
    if step_x != 0 {
        for side in -1..=1 {
            columns.push(current.offset(step_x, side));
        }
        if step_x < 0 {
            columns.push(current.offset(2 * step_x, 0));
        }
    }

    let step_z = current.z.cmp(&previous.z) as i32;
    if step_z != 0 {
        for side in -1..=1 {
            columns.push(current.offset(side, step_z));
        }
        if step_z < 0 {
            columns.push(current.offset(0, 2 * step_z));
        }
    }

    columns
}
