//! Player physics and input state machine.
//!
//! Network readers write into a per-player [`InputBuffer`]; the coordinator
//! tick drains each buffer exactly once and feeds the flags to
//! [`Player::step`]. However many times an action arrives inside one tick
//! window, it is applied at most once.
//!
//! Coordinates: `x` is measured in lanes (lane `n` sits at `x == n`), `y`
//! grows downward, so jumping and climbing up make `y` smaller.

use crate::config::{PlayerTuning, WorldLayout};
use crate::entity::Entity;
use parking_lot::Mutex;
use shared::{Facing, InputAction, LaneRegistry, PlayerId, PlayerState, PlayerView};
use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot flags collected between two ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputFlags {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub jump: bool,
    pub grab: bool,
}

impl InputFlags {
    pub fn set(&mut self, action: InputAction) {
        match action {
            InputAction::Left => self.left = true,
            InputAction::Right => self.right = true,
            InputAction::Up => self.up = true,
            InputAction::Down => self.down = true,
            InputAction::Jump => self.jump = true,
            InputAction::Grab => self.grab = true,
        }
    }

    /// -1 for left, +1 for right, 0 for neither or both.
    pub fn horizontal(&self) -> i32 {
        self.right as i32 - self.left as i32
    }

    /// -1 for up (towards smaller y), +1 for down.
    pub fn vertical(&self) -> i32 {
        self.down as i32 - self.up as i32
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Input written by the connection reader and drained by the tick.
#[derive(Debug)]
pub struct InputBuffer {
    flags: Mutex<InputFlags>,
    accepting: AtomicBool,
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBuffer {
    pub fn new() -> Self {
        Self {
            flags: Mutex::new(InputFlags::default()),
            accepting: AtomicBool::new(true),
        }
    }

    /// Buffers an action. Returns false while the player cannot act.
    pub fn register(&self, action: InputAction) -> bool {
        if !self.is_accepting() {
            return false;
        }
        self.flags.lock().set(action);
        true
    }

    /// Parses and buffers a raw action name.
    pub fn register_str(&self, action: &str) -> bool {
        action
            .parse::<InputAction>()
            .map_or(false, |action| self.register(action))
    }

    /// Returns the buffered flags and clears them.
    pub fn consume(&self) -> InputFlags {
        std::mem::take(&mut *self.flags.lock())
    }

    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::Release);
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub state: PlayerState,
    pub facing: Facing,
    /// Set exactly while the player is on a rope.
    pub lane_id: Option<usize>,
    pub lives: u32,
    pub score: u32,
    pub active: bool,
    grab_timer: f32,
    lane_cooldown: f32,
    celebration_timer: f32,
}

impl Player {
    pub fn new(id: PlayerId, world: &WorldLayout, tuning: &PlayerTuning) -> Self {
        Self {
            id,
            x: world.spawn_lane as f32,
            y: world.spawn_y,
            vx: 0.0,
            vy: 0.0,
            state: PlayerState::Ground,
            facing: Facing::default(),
            lane_id: None,
            lives: tuning.initial_lives,
            score: 0,
            active: true,
            grab_timer: 0.0,
            lane_cooldown: 0.0,
            celebration_timer: 0.0,
        }
    }

    pub fn accepts_input(&self) -> bool {
        self.active && !matches!(self.state, PlayerState::Dead | PlayerState::Celebrating)
    }

    pub fn is_celebrating(&self) -> bool {
        self.state == PlayerState::Celebrating
    }

    /// Advances the player by one tick using the flags drained for it.
    pub fn step(
        &mut self,
        input: InputFlags,
        dt: f32,
        tuning: &PlayerTuning,
        world: &WorldLayout,
        lanes: &LaneRegistry,
    ) {
        if !self.active || matches!(self.state, PlayerState::Dead | PlayerState::Celebrating) {
            return;
        }

        self.grab_timer = (self.grab_timer - dt).max(0.0);
        self.lane_cooldown = (self.lane_cooldown - dt).max(0.0);

        let horizontal = input.horizontal();
        let vertical = input.vertical();
        if horizontal < 0 {
            self.facing = Facing::Left;
        } else if horizontal > 0 {
            self.facing = Facing::Right;
        }
        if input.grab || (vertical != 0 && self.state == PlayerState::Jumping) {
            self.grab_timer = tuning.grab_buffer;
        }

        match self.state {
            PlayerState::Ground => {
                self.step_ground(input, horizontal, vertical, dt, tuning, world, lanes)
            }
            PlayerState::Jumping => self.step_airborne(horizontal, dt, tuning, world, lanes),
            PlayerState::OnRope => {
                self.step_rope(input, horizontal, vertical, dt, tuning, world, lanes)
            }
            PlayerState::Dead | PlayerState::Celebrating => {}
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn step_ground(
        &mut self,
        input: InputFlags,
        horizontal: i32,
        vertical: i32,
        dt: f32,
        tuning: &PlayerTuning,
        world: &WorldLayout,
        lanes: &LaneRegistry,
    ) {
        if vertical != 0 || input.grab {
            if let Some(lane) = self.lane_in_reach(tuning, lanes) {
                self.grab(lane);
                return;
            }
        }

        if input.jump {
            self.state = PlayerState::Jumping;
            self.vy = -tuning.jump_speed;
            self.step_airborne(horizontal, dt, tuning, world, lanes);
            return;
        }

        self.update_horizontal(horizontal, dt, tuning, false);
        self.move_horizontally(dt, lanes);
        self.y = world.ground_y;
        self.vy = 0.0;

        if !world.is_over_ground(self.x) {
            self.state = PlayerState::Jumping;
        }
    }

    fn step_airborne(
        &mut self,
        horizontal: i32,
        dt: f32,
        tuning: &PlayerTuning,
        world: &WorldLayout,
        lanes: &LaneRegistry,
    ) {
        self.update_horizontal(horizontal, dt, tuning, true);
        self.move_horizontally(dt, lanes);

        // Semi-implicit Euler
        self.vy += tuning.gravity * dt;
        self.y += self.vy * dt;

        if self.grab_timer > 0.0 {
            if let Some(lane) = self.lane_in_reach(tuning, lanes) {
                self.grab(lane);
                return;
            }
        }

        if self.vy >= 0.0 && self.y >= world.ground_y && world.is_over_ground(self.x) {
            self.land(world);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn step_rope(
        &mut self,
        input: InputFlags,
        horizontal: i32,
        vertical: i32,
        dt: f32,
        tuning: &PlayerTuning,
        world: &WorldLayout,
        lanes: &LaneRegistry,
    ) {
        let Some(lane) = self.lane_id else {
            // Lost track of the rope; drop into a fall.
            self.state = PlayerState::Jumping;
            return;
        };

        if input.jump {
            self.lane_id = None;
            self.state = PlayerState::Jumping;
            self.grab_timer = 0.0;
            self.vy = -tuning.rope_jump_speed;
            self.vx = horizontal as f32 * tuning.max_speed;
            self.step_airborne(horizontal, dt, tuning, world, lanes);
            return;
        }

        let mut lane = lane;
        if horizontal != 0 && self.lane_cooldown <= 0.0 {
            if let Some(target) = lane.checked_add_signed(horizontal as isize) {
                if lanes.is_within_range(target, self.y) {
                    lane = target;
                    self.lane_id = Some(target);
                    self.x = target as f32;
                    self.lane_cooldown = tuning.lane_change_cooldown;
                }
            }
        }

        self.vx = 0.0;
        self.vy = vertical as f32 * tuning.climb_speed;
        self.y = lanes.clamp(lane, self.y + self.vy * dt);

        if vertical > 0 && self.y >= world.ground_y && world.is_over_ground(self.x) {
            self.land(world);
        }
    }

    fn update_horizontal(&mut self, horizontal: i32, dt: f32, tuning: &PlayerTuning, airborne: bool) {
        let control = if airborne { tuning.air_control } else { 1.0 };
        if horizontal != 0 {
            let target = horizontal as f32 * tuning.max_speed;
            self.vx = approach(self.vx, target, tuning.acceleration * control * dt);
        } else {
            self.vx = approach(self.vx, 0.0, tuning.friction * control * dt);
        }
    }

    fn move_horizontally(&mut self, dt: f32, lanes: &LaneRegistry) {
        let right_edge = lanes.last_index().unwrap_or(0) as f32;
        let x = self.x + self.vx * dt;
        if x <= 0.0 || x >= right_edge {
            self.vx = 0.0;
        }
        self.x = x.clamp(0.0, right_edge);
    }

    fn lane_in_reach(&self, tuning: &PlayerTuning, lanes: &LaneRegistry) -> Option<usize> {
        let nearest = self.x.round();
        if nearest < 0.0 || (self.x - nearest).abs() > tuning.grab_distance {
            return None;
        }
        let lane = nearest as usize;
        lanes.is_within_range(lane, self.y).then_some(lane)
    }

    fn grab(&mut self, lane: usize) {
        self.state = PlayerState::OnRope;
        self.lane_id = Some(lane);
        self.x = lane as f32;
        self.vx = 0.0;
        self.vy = 0.0;
        self.grab_timer = 0.0;
    }

    fn land(&mut self, world: &WorldLayout) {
        self.state = PlayerState::Ground;
        self.lane_id = None;
        self.y = world.ground_y;
        self.vy = 0.0;
    }

    /// Takes a life and forces `Dead`. Returns whether the player may continue.
    pub fn lose_life(&mut self) -> bool {
        self.lives = self.lives.saturating_sub(1);
        self.state = PlayerState::Dead;
        self.lane_id = None;
        self.vx = 0.0;
        self.vy = 0.0;
        self.grab_timer = 0.0;
        self.lives > 0
    }

    /// Back to the spawn point on the ground. Score and lives are kept.
    pub fn respawn(&mut self, world: &WorldLayout) {
        self.x = world.spawn_lane as f32;
        self.y = world.spawn_y;
        self.vx = 0.0;
        self.vy = 0.0;
        self.state = PlayerState::Ground;
        self.facing = Facing::default();
        self.lane_id = None;
        self.grab_timer = 0.0;
        self.lane_cooldown = 0.0;
        self.celebration_timer = 0.0;
    }

    /// Freezes the player in place for `duration` seconds.
    pub fn celebrate(&mut self, duration: f32) {
        self.state = PlayerState::Celebrating;
        self.lane_id = None;
        self.vx = 0.0;
        self.vy = 0.0;
        self.grab_timer = 0.0;
        self.celebration_timer = duration;
    }

    pub fn tick_celebration(&mut self, dt: f32) {
        self.celebration_timer = (self.celebration_timer - dt).max(0.0);
    }

    pub fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            x: self.x,
            y: self.y,
            vx: self.vx,
            vy: self.vy,
            lane: self.lane_id,
            state: self.state,
            facing: self.facing,
            lives: self.lives,
            score: self.score,
            celebrating: self.is_celebrating(),
        }
    }
}

impl Entity for Player {
    type Id = PlayerId;

    fn id(&self) -> PlayerId {
        self.id
    }

    /// The rope being held, otherwise the lane closest to `x`.
    fn lane(&self) -> Option<usize> {
        if !self.active || self.state == PlayerState::Dead {
            return None;
        }
        match self.lane_id {
            Some(lane) => Some(lane),
            None if self.x >= 0.0 => Some(self.x.round() as usize),
            None => None,
        }
    }

    fn y(&self) -> f32 {
        self.y
    }
}

fn approach(current: f32, target: f32, delta: f32) -> f32 {
    if current < target {
        (current + delta).min(target)
    } else {
        (current - delta).max(target)
    }
}
