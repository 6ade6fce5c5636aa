//! Grid geometry: points, directions and walks along axis-aligned segments.
//!
//! Everything here is pure. The engine and the bot policy build on these
//! helpers so that a snake's heading never has to be stored: it is always
//! derived from its polyline.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// A board coordinate. Signed so that a step past the edge is representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell one step in `direction`.
    pub fn step(self, direction: Direction) -> Point {
        let (dx, dy) = direction.delta();
        Point::new(self.x + dx, self.y + dy)
    }

    /// Moves `distance` cells in `direction`.
    pub fn offset(self, direction: Direction, distance: i32) -> Point {
        let (dx, dy) = direction.delta();
        Point::new(self.x + dx * distance, self.y + dy * distance)
    }
}

/// One of the four grid headings. Screen coordinates: `Up` decreases `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn from_delta(dx: i32, dy: i32) -> Option<Direction> {
        match (dx.signum(), dy.signum()) {
            (0, -1) => Some(Direction::Up),
            (0, 1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            (1, 0) => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Dot product of the unit vectors.
    pub fn dot(self, other: Direction) -> i32 {
        let (ax, ay) = self.delta();
        let (bx, by) = other.delta();
        ax * bx + ay * by
    }

    pub fn is_perpendicular(self, other: Direction) -> bool {
        self.dot(other) == 0
    }

    /// The two perpendicular turns, positive axis first.
    pub fn turns(self) -> [Direction; 2] {
        match self {
            Direction::Up | Direction::Down => [Direction::Right, Direction::Left],
            Direction::Left | Direction::Right => [Direction::Down, Direction::Up],
        }
    }
}

pub fn out_of_bounds(point: Point, width: i32, height: i32) -> bool {
    point.x < 0 || point.x >= width || point.y < 0 || point.y >= height
}

/// Component-wise sign of `to - from`, or `None` if the points coincide or
/// are not axis-aligned.
pub fn unit_direction(from: Point, to: Point) -> Option<Direction> {
    Direction::from_delta(to.x - from.x, to.y - from.y)
}

pub fn square_distance(a: Point, b: Point) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    dx * dx + dy * dy
}

/// Visits every cell from `from` to `to` inclusive, in that order.
pub fn walk_line<F>(from: Point, to: Point, mut visit: F) -> Result<(), EngineError>
where
    F: FnMut(Point),
{
    if from == to {
        visit(from);
        return Ok(());
    }
    let direction =
        unit_direction(from, to).ok_or(EngineError::DiagonalSegment { from, to })?;

    let mut current = from;
    visit(current);
    while current != to {
        current = current.step(direction);
        visit(current);
    }
    Ok(())
}

/// Visits every cell covered by a polyline exactly once, head first.
///
/// Vertices shared by two consecutive segments are only visited once.
pub fn walk_polyline<'a, I, F>(articulations: I, mut visit: F) -> Result<(), EngineError>
where
    I: IntoIterator<Item = &'a Point>,
    F: FnMut(Point),
{
    let mut points = articulations.into_iter();
    let Some(&first) = points.next() else {
        return Ok(());
    };

    visit(first);
    let mut previous = first;
    for &next in points {
        let mut skip_shared = true;
        walk_line(previous, next, |p| {
            if skip_shared {
                skip_shared = false;
            } else {
                visit(p);
            }
        })?;
        previous = next;
    }
    Ok(())
}

/// A possible next move for a snake, scored against a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub direction: Direction,
    pub next: Point,
    pub distance: i64,
}

/// The three directions a snake heading `current` can take from `origin`
/// (straight, then both turns), sorted by squared distance to `target`.
///
/// The sort is stable, so on ties going straight wins over turning.
pub fn candidate_directions(origin: Point, current: Direction, target: Point) -> [Candidate; 3] {
    let [turn_a, turn_b] = current.turns();
    let mut candidates = [current, turn_a, turn_b].map(|direction| {
        let next = origin.step(direction);
        Candidate {
            direction,
            next,
            distance: square_distance(next, target),
        }
    });
    candidates.sort_by_key(|c| c.distance);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_line(from: Point, to: Point) -> Vec<Point> {
        let mut out = Vec::new();
        walk_line(from, to, |p| out.push(p)).unwrap();
        out
    }

    #[test]
    fn test_out_of_bounds() {
        assert!(!out_of_bounds(Point::new(0, 0), 20, 20));
        assert!(!out_of_bounds(Point::new(19, 19), 20, 20));
        assert!(out_of_bounds(Point::new(20, 5), 20, 20));
        assert!(out_of_bounds(Point::new(5, -1), 20, 20));
        assert!(out_of_bounds(Point::new(-1, 0), 20, 20));
    }

    #[test]
    fn test_unit_direction() {
        let origin = Point::new(5, 5);
        assert_eq!(unit_direction(origin, Point::new(9, 5)), Some(Direction::Right));
        assert_eq!(unit_direction(origin, Point::new(1, 5)), Some(Direction::Left));
        assert_eq!(unit_direction(origin, Point::new(5, 0)), Some(Direction::Up));
        assert_eq!(unit_direction(origin, Point::new(5, 7)), Some(Direction::Down));
        assert_eq!(unit_direction(origin, origin), None);
        assert_eq!(unit_direction(origin, Point::new(6, 6)), None);
    }

    #[test]
    fn test_perpendicular_and_turns() {
        assert!(Direction::Up.is_perpendicular(Direction::Left));
        assert!(!Direction::Up.is_perpendicular(Direction::Down));
        assert!(!Direction::Up.is_perpendicular(Direction::Up));
        assert_eq!(Direction::Right.turns(), [Direction::Down, Direction::Up]);
        assert_eq!(Direction::Up.turns(), [Direction::Right, Direction::Left]);
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            assert_eq!(d.dot(d.opposite()), -1);
        }
    }

    #[test]
    fn test_walk_line_both_directions() {
        assert_eq!(
            collect_line(Point::new(2, 3), Point::new(5, 3)),
            vec![
                Point::new(2, 3),
                Point::new(3, 3),
                Point::new(4, 3),
                Point::new(5, 3)
            ]
        );
        assert_eq!(
            collect_line(Point::new(4, 6), Point::new(4, 4)),
            vec![Point::new(4, 6), Point::new(4, 5), Point::new(4, 4)]
        );
        assert_eq!(collect_line(Point::new(1, 1), Point::new(1, 1)), vec![Point::new(1, 1)]);
    }

    #[test]
    fn test_walk_line_rejects_diagonal() {
        let result = walk_line(Point::new(0, 0), Point::new(2, 2), |_| {});
        assert_eq!(
            result,
            Err(EngineError::DiagonalSegment {
                from: Point::new(0, 0),
                to: Point::new(2, 2)
            })
        );
    }

    #[test]
    fn test_walk_polyline_visits_each_cell_once() {
        // An L-shape: head at (3,0), corner at (3,2), tail at (0,2).
        let body = [Point::new(3, 0), Point::new(3, 2), Point::new(0, 2)];
        let mut visited = Vec::new();
        walk_polyline(&body, |p| visited.push(p)).unwrap();

        assert_eq!(visited.len(), 6);
        assert_eq!(visited[0], Point::new(3, 0));
        assert_eq!(visited[2], Point::new(3, 2));
        assert_eq!(*visited.last().unwrap(), Point::new(0, 2));

        let mut deduped = visited.clone();
        deduped.sort_by_key(|p| (p.x, p.y));
        deduped.dedup();
        assert_eq!(deduped.len(), visited.len());
    }

    #[test]
    fn test_candidate_directions_sorted() {
        // Heading right, apple straight above: turning up is best, going down worst.
        let candidates = candidate_directions(Point::new(5, 5), Direction::Right, Point::new(5, 0));
        assert_eq!(candidates[0].direction, Direction::Up);
        assert_eq!(candidates[0].next, Point::new(5, 4));
        assert_eq!(candidates[2].direction, Direction::Down);
        assert!(candidates[0].distance <= candidates[1].distance);
        assert!(candidates[1].distance <= candidates[2].distance);
    }

    #[test]
    fn test_candidate_directions_tie_prefers_straight() {
        // Target straight behind: the two turns tie and keep their positive-axis-first order.
        let candidates = candidate_directions(Point::new(5, 5), Direction::Right, Point::new(0, 5));
        assert_eq!(candidates[0].direction, Direction::Down);
        assert_eq!(candidates[1].direction, Direction::Up);
        assert_eq!(candidates[2].direction, Direction::Right);

        // Target dead ahead: straight is strictly best.
        let ahead = candidate_directions(Point::new(5, 5), Direction::Right, Point::new(9, 5));
        assert_eq!(ahead[0].direction, Direction::Right);
    }
}
