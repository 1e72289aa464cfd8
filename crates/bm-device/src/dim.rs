use std::fmt;

/// A 2-D extent or index: `x` counts columns, `y` counts rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dim2 {
    pub x: usize,
    pub y: usize,
}

impl Dim2 {
    pub const fn new(x: usize, y: usize) -> Self {
        Dim2 { x, y }
    }

    /// Total number of positions (`x * y`).
    pub fn count(&self) -> usize {
        self.x * self.y
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Row-major position of linear index `i` (x varies fastest).
    pub(crate) fn unflatten(&self, i: usize) -> Dim2 {
        Dim2 {
            x: i % self.x,
            y: i / self.x,
        }
    }
}

impl fmt::Display for Dim2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Grid and group shape of one kernel launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Number of groups along each axis.
    pub grid: Dim2,
    /// Number of workers per group along each axis.
    pub block: Dim2,
}

impl LaunchConfig {
    pub fn new(grid: Dim2, block: Dim2) -> Self {
        LaunchConfig { grid, block }
    }

    /// Total number of workers across the grid.
    pub fn threads(&self) -> usize {
        self.grid.count() * self.block.count()
    }

    /// Global worker extent: `grid * block` per axis.
    pub fn extent(&self) -> Dim2 {
        Dim2 {
            x: self.grid.x * self.block.x,
            y: self.grid.y * self.block.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unflatten_x_fastest() {
        let d = Dim2::new(3, 2);
        let order: Vec<Dim2> = (0..d.count()).map(|i| d.unflatten(i)).collect();
        assert_eq!(order[0], Dim2::new(0, 0));
        assert_eq!(order[2], Dim2::new(2, 0));
        assert_eq!(order[3], Dim2::new(0, 1));
        assert_eq!(order[5], Dim2::new(2, 1));
    }

    #[test]
    fn test_launch_extent() {
        let cfg = LaunchConfig::new(Dim2::new(2, 3), Dim2::new(16, 16));
        assert_eq!(cfg.extent(), Dim2::new(32, 48));
        assert_eq!(cfg.threads(), 6 * 256);
        assert!(Dim2::new(0, 4).is_empty());
        assert_eq!(Dim2::new(4, 1).to_string(), "(4, 1)");
    }
}
