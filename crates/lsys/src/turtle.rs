//! Turtle graphics interpreter.
//!
//! Walks a symbol string and emits line segments. Which characters mean
//! "draw", "turn", "push" and so on is configurable through [`Alphabet`];
//! anything not in the alphabet is bookkeeping for the grammar and is skipped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LsysError;
use crate::geometry::{Point, Vector, point};

/// What a symbol makes the turtle do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurtleCommand {
    /// Step forward and emit a segment
    Draw,
    /// Step forward without drawing
    Move,
    /// Heading += angle
    TurnLeft,
    /// Heading -= angle
    TurnRight,
    /// Heading += 180°
    TurnAround,
    /// Save the current pose
    Push,
    /// Restore the most recently saved pose
    Pop,
}

/// Characters bound to each turtle command.
///
/// Each field is a string of characters; every character in it triggers
/// the command. The default is the classic `F`/`G`, `f`, `+`, `-`, `|`,
/// `[`, `]` alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Alphabet {
    pub draw: String,
    pub move_forward: String,
    pub turn_left: String,
    pub turn_right: String,
    pub turn_around: String,
    pub push: String,
    pub pop: String,
}

impl Default for Alphabet {
    fn default() -> Self {
        Self {
            draw: "FG".to_string(),
            move_forward: "f".to_string(),
            turn_left: "+".to_string(),
            turn_right: "-".to_string(),
            turn_around: "|".to_string(),
            push: "[".to_string(),
            pop: "]".to_string(),
        }
    }
}

impl Alphabet {
    fn bindings(&self) -> [(&str, TurtleCommand); 7] {
        [
            (self.draw.as_str(), TurtleCommand::Draw),
            (self.move_forward.as_str(), TurtleCommand::Move),
            (self.turn_left.as_str(), TurtleCommand::TurnLeft),
            (self.turn_right.as_str(), TurtleCommand::TurnRight),
            (self.turn_around.as_str(), TurtleCommand::TurnAround),
            (self.push.as_str(), TurtleCommand::Push),
            (self.pop.as_str(), TurtleCommand::Pop),
        ]
    }

    /// Every (character, command) pair, in field order.
    fn symbols(&self) -> impl Iterator<Item = (char, TurtleCommand)> + '_ {
        self.bindings()
            .into_iter()
            .flat_map(|(chars, command)| chars.chars().map(move |c| (c, command)))
    }

    /// Build the symbol lookup table, rejecting characters bound twice.
    pub fn command_map(&self) -> Result<HashMap<char, TurtleCommand>, LsysError> {
        let mut map = HashMap::new();
        for (c, command) in self.symbols() {
            if let Some(existing) = map.insert(c, command) {
                if existing != command {
                    return Err(LsysError::Config(format!(
                        "symbol {:?} is bound to both {:?} and {:?}",
                        c, existing, command
                    )));
                }
            }
        }
        Ok(map)
    }
}

/// Turtle settings: starting heading, step length and alphabet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurtleConfig {
    /// Initial heading in degrees (90 = up)
    pub heading: f32,
    /// Distance covered by one draw/move command
    pub step: f32,
    pub alphabet: Alphabet,
}

impl Default for TurtleConfig {
    fn default() -> Self {
        Self {
            heading: 90.0,
            step: 1.0,
            alphabet: Alphabet::default(),
        }
    }
}

/// Position and heading (degrees, kept in `[0, 360)`) of the turtle.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pose {
    position: Point,
    heading: f32,
}

impl Pose {
    fn at_origin(heading: f32) -> Self {
        Self {
            position: point(0.0, 0.0),
            heading: heading.rem_euclid(360.0),
        }
    }

    fn turn(&mut self, degrees: f32) {
        self.heading = (self.heading + degrees).rem_euclid(360.0);
    }

    fn direction(&self) -> Vector {
        let (sin, cos) = self.heading.to_radians().sin_cos();
        Vector::new(cos, sin)
    }
}

/// The interpreter. Holds no state between calls to [`Turtle::interpret`].
#[derive(Debug, Clone)]
pub struct Turtle {
    commands: HashMap<char, TurtleCommand>,
    start: Pose,
    step: f32,
}

impl Default for Turtle {
    /// The default alphabet has no conflicts, so no validation is needed.
    fn default() -> Self {
        let config = TurtleConfig::default();
        Self {
            commands: config.alphabet.symbols().collect(),
            start: Pose::at_origin(config.heading),
            step: config.step,
        }
    }
}

impl Turtle {
    pub fn new(config: &TurtleConfig) -> Result<Self, LsysError> {
        if !config.heading.is_finite() {
            return Err(LsysError::Config(format!(
                "turtle heading must be finite, got {}",
                config.heading
            )));
        }
        if !(config.step.is_finite() && config.step > 0.0) {
            return Err(LsysError::Config(format!(
                "turtle step must be positive, got {}",
                config.step
            )));
        }

        Ok(Self {
            commands: config.alphabet.command_map()?,
            start: Pose::at_origin(config.heading),
            step: config.step,
        })
    }

    pub fn command(&self, symbol: char) -> Option<TurtleCommand> {
        self.commands.get(&symbol).copied()
    }

    /// Walk `symbols`, turning by `angle` degrees, and return segment endpoints.
    ///
    /// Consecutive pairs of the returned points are line segments, so the
    /// length is always even. A pop with nothing pushed is ignored.
    pub fn interpret(&self, symbols: &str, angle: f32) -> Vec<Point> {
        let mut vertices = Vec::new();
        let mut stack: Vec<Pose> = Vec::new();
        let mut pose = self.start;
        let mut unmatched_pops = 0usize;

        for c in symbols.chars() {
            let Some(command) = self.command(c) else {
                continue;
            };

            match command {
                TurtleCommand::Draw => {
                    let next = pose.position + pose.direction() * self.step;
                    vertices.push(pose.position);
                    vertices.push(next);
                    pose.position = next;
                }
                TurtleCommand::Move => {
                    pose.position += pose.direction() * self.step;
                }
                TurtleCommand::TurnLeft => pose.turn(angle),
                TurtleCommand::TurnRight => pose.turn(-angle),
                TurtleCommand::TurnAround => pose.turn(180.0),
                TurtleCommand::Push => stack.push(pose),
                TurtleCommand::Pop => match stack.pop() {
                    Some(saved) => pose = saved,
                    None => unmatched_pops += 1,
                },
            }
        }

        if unmatched_pops > 0 {
            debug!(unmatched_pops, "ignored pop commands on an empty turtle stack");
        }

        vertices
    }
}
