//! Session state and the per-tick update.

use tracing::{debug, info};

use crate::config::{GameConfig, MovementConfig, PowerUpConfig};
use crate::game::{
    Board, Cell, EndReason, Entity, GameEvent, Hitbox, InputSource, KeyboardInput, Player, PlayerId,
    PowerUpPool, PowerUpState, RectangleSearch, ScoreLadder, TerritoryGrid,
};
use crate::sensor::MailboxConsumer;

/// Everything mutated by the simulation, owned by a single driver.
///
/// Players are stored in id order: `players[id - 1]`.
#[derive(Debug)]
pub struct SessionState {
    board: Board,
    grid: TerritoryGrid,
    players: Vec<Player>,
    pool: PowerUpPool,
    ladder: ScoreLadder,
    movement: MovementConfig,
    power_ups: PowerUpConfig,
    min_rectangle: [usize; 2],
    session_secs: u32,
    elapsed: u32,
    ticks: u64,
    end: Option<EndReason>,
}

impl SessionState {
    /// Create a fresh session with every player on its starting cell.
    ///
    /// The configuration is expected to have passed
    /// [`GameConfig::validate`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(config: &GameConfig, seed: u64) -> Self {
        let board = Board::new(&config.board);
        let grid = TerritoryGrid::new(usize::from(board.width()), usize::from(board.height()));
        let players = config
            .board
            .starting_cells
            .iter()
            .enumerate()
            .map(|(idx, &[x, y])| {
                let start = Cell::new(x, y);
                Player::new(idx as PlayerId + 1, start, board.token_at(start))
            })
            .collect();

        Self {
            board,
            grid,
            players,
            pool: PowerUpPool::new(&config.power_ups, seed),
            ladder: ScoreLadder::new(config.scoring.thresholds, config.scoring.policy),
            movement: config.movement,
            power_ups: config.power_ups,
            min_rectangle: config.board.min_rectangle,
            session_secs: config.timing.session_secs,
            elapsed: 0,
            ticks: 0,
            end: None,
        }
    }

    /// Board geometry.
    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// Tile ownership.
    #[must_use]
    pub const fn grid(&self) -> &TerritoryGrid {
        &self.grid
    }

    /// Pickups on the board.
    #[must_use]
    pub const fn pool(&self) -> &PowerUpPool {
        &self.pool
    }

    /// Threshold ladder in use.
    #[must_use]
    pub const fn ladder(&self) -> &ScoreLadder {
        &self.ladder
    }

    /// Pickup cadence and power-up timers.
    #[must_use]
    pub const fn power_up_config(&self) -> &PowerUpConfig {
        &self.power_ups
    }

    /// All players, in id order.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Get a player by ID.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Get a mutable reference to a player by ID.
    #[must_use]
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Owner of a field cell, if it is playable and claimed.
    #[must_use]
    pub fn owner_of(&self, cell: Cell) -> Option<PlayerId> {
        let (x, y) = self.board.local(cell)?;
        self.grid.owner(x, y)
    }

    /// Elapsed whole seconds at the last tick.
    #[must_use]
    pub const fn elapsed(&self) -> u32 {
        self.elapsed
    }

    /// Seconds left in the time budget.
    #[must_use]
    pub const fn remaining_secs(&self) -> u32 {
        self.session_secs.saturating_sub(self.elapsed)
    }

    /// Ticks processed so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Whether the session has ended.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.end.is_some()
    }

    /// Why the session ended, once it has.
    #[must_use]
    pub const fn end_reason(&self) -> Option<EndReason> {
        self.end
    }

    /// Highest scorer, lowest id on ties. `None` while nobody has scored.
    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        let best = self.players.iter().map(|p| p.score).max()?;
        if best == 0 {
            return None;
        }
        self.players.iter().find(|p| p.score == best).map(|p| p.id)
    }

    /// Drive a player from the keyboard.
    pub fn set_keyboard(&mut self, id: PlayerId) {
        if let Some(player) = self.player_mut(id) {
            player.input = InputSource::Keyboard(KeyboardInput::default());
        }
    }

    /// Keyboard state of a keyboard-driven player.
    pub fn keyboard_mut(&mut self, id: PlayerId) -> Option<&mut KeyboardInput> {
        self.player_mut(id)?.keyboard_mut()
    }

    /// Hand a sensor feed to a player, replacing any previous input.
    pub fn attach_sensor(&mut self, id: PlayerId, mailbox: MailboxConsumer) -> Option<GameEvent> {
        let player = self.player_mut(id)?;
        player.input = InputSource::Sensor(mailbox);
        info!(player = id, "sensor attached");
        Some(GameEvent::SensorAttached { player: id })
    }

    /// End the session early.
    pub fn stop(&mut self) -> Option<GameEvent> {
        if self.is_over() {
            return None;
        }
        let mut events = Vec::with_capacity(1);
        self.finish(EndReason::Stopped, &mut events);
        events.pop()
    }

    /// Advance the simulation by one tick stamped with `elapsed` seconds.
    ///
    /// Per player: boost trigger, movement and collision, tile claim and
    /// rectangle scoring, pickup collection. Then pickup decay, power-up
    /// timers, termination checks and spawning. Ticks after the end are
    /// ignored.
    pub fn tick(&mut self, elapsed: u32) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.is_over() {
            return events;
        }
        self.elapsed = elapsed;
        self.ticks += 1;

        for idx in 0..self.players.len() {
            self.step_player(idx, &mut events);
        }

        for pickup in self.pool.decay(elapsed) {
            debug!(x = pickup.cell.x, y = pickup.cell.y, "power-up expired");
            events.push(GameEvent::PowerUpExpired { cell: pickup.cell });
        }

        self.expire_timers(&mut events);

        let cap = self.ladder.cap();
        if self.players.iter().any(|p| p.score >= cap) {
            self.finish(EndReason::MaxScore, &mut events);
        } else if elapsed >= self.session_secs {
            for pickup in self.pool.clear() {
                events.push(GameEvent::PowerUpExpired { cell: pickup.cell });
            }
            self.finish(EndReason::TimeUp, &mut events);
        } else if let Some(pickup) = self.pool.maybe_spawn(elapsed, &self.board) {
            debug!(x = pickup.cell.x, y = pickup.cell.y, "power-up spawned");
            events.push(GameEvent::PowerUpSpawned { cell: pickup.cell });
        }

        events
    }

    fn step_player(&mut self, idx: usize, events: &mut Vec<GameEvent>) {
        let now = self.elapsed;
        let player = &mut self.players[idx];
        let id = player.id;

        if player.take_boost_trigger() && player.activate_boost(now) {
            debug!(player = id, "boost activated");
            events.push(GameEvent::BoostActivated { player: id });
        }

        if let Some((dx, dy)) = player.next_displacement(&self.movement) {
            let before = player.move_by(dx, dy);
            if self.is_swept_blocked(idx, &before, dx, dy) {
                self.players[idx].revert_to(before);
            }
        }

        let hitbox = self.players[idx].hitbox();
        if let Some(cell) = self.board.tile_under(&hitbox) {
            self.claim_tile(idx, cell, events);
        }
        self.collect_pickup(idx, events);
    }

    /// Whether any point of a move from `start` by `(dx, dy)` is blocked.
    ///
    /// The path is checked in steps of at most half a tile so a long sensor
    /// displacement cannot jump across the border ring.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn is_swept_blocked(&self, idx: usize, start: &Hitbox, dx: f32, dy: f32) -> bool {
        let max_step = self.board.tile_size() / 2.0;
        let distance = dx.abs().max(dy.abs());
        // Anything longer than the field would leave it.
        let extent = f32::from(self.board.cols().max(self.board.rows())) * self.board.tile_size();
        if !distance.is_finite() || distance > extent {
            return true;
        }
        let steps = ((distance / max_step).ceil() as u32).max(1);
        (1..=steps).any(|k| {
            let fraction = k as f32 / steps as f32;
            self.is_blocked_at(idx, &start.translated(dx * fraction, dy * fraction))
        })
    }

    /// Whether a hitbox for player `idx` overlaps the border or another token.
    fn is_blocked_at(&self, idx: usize, hitbox: &Hitbox) -> bool {
        let others = self
            .players
            .iter()
            .enumerate()
            .filter(|&(other, _)| other != idx)
            .map(|(_, p)| p.entity());

        self.board
            .border_entities()
            .chain(others)
            .filter(Entity::is_solid)
            .any(|entity| entity.bounds(&self.board).intersects(hitbox))
    }

    fn claim_tile(&mut self, idx: usize, cell: Cell, events: &mut Vec<GameEvent>) {
        let Some((x, y)) = self.board.local(cell) else {
            return;
        };
        let id = self.players[idx].id;
        let claim = self.grid.claim(id, x, y);
        if !claim.changed {
            return;
        }
        debug!(player = id, x = cell.x, y = cell.y, previous = ?claim.previous, "tile claimed");
        events.push(GameEvent::Occupancy {
            cell,
            owner: Some(id),
        });

        let [min_height, min_width] = self.min_rectangle;
        let rect = self.grid.closed_rectangle(id, min_height, min_width);
        if rect.is_found() {
            self.score_rectangle(idx, &rect, events);
        }
    }

    fn score_rectangle(&mut self, idx: usize, rect: &RectangleSearch, events: &mut Vec<GameEvent>) {
        let (ax, ay) = rect.anchor;
        let anchor = self.board.field(ax.unsigned_abs(), ay.unsigned_abs());
        let points = u32::try_from(rect.area()).unwrap_or(u32::MAX);

        let player = &mut self.players[idx];
        let id = player.id;
        let update = player.award(&self.ladder, points);
        info!(player = id, points, score = update.score, leds = update.active_leds, "rectangle closed");

        // Matrix rows run along the board's x axis.
        events.push(GameEvent::ScoreAwarded {
            player: id,
            anchor,
            cols: rect.height,
            rows: rect.width,
            points,
            score: update.score,
        });
        events.extend(update.newly_lit().map(|led| GameEvent::ThresholdReached { player: id, led }));

        for &(x, y) in &rect.perimeter {
            self.grid.release(id, x, y);
            events.push(GameEvent::Occupancy {
                cell: self.board.field(x, y),
                owner: None,
            });
        }
    }

    fn collect_pickup(&mut self, idx: usize, events: &mut Vec<GameEvent>) {
        let player = &self.players[idx];
        if player.power != PowerUpState::Idle {
            return;
        }
        let hitbox = player.hitbox();
        let Some(cell) = self
            .pool
            .iter()
            .map(|p| p.cell)
            .find(|&cell| Entity::PowerUp(cell).bounds(&self.board).intersects(&hitbox))
        else {
            return;
        };

        self.pool.take_at(cell);
        let player = &mut self.players[idx];
        player.collect_power_up(self.elapsed);
        debug!(player = player.id, x = cell.x, y = cell.y, "power-up collected");
        events.push(GameEvent::PowerUpCollected {
            player: player.id,
            cell,
        });
    }

    fn expire_timers(&mut self, events: &mut Vec<GameEvent>) {
        let held = self.power_ups.held_validity_secs;
        let boost = self.power_ups.boost_duration_secs;
        for player in &mut self.players {
            match player.expire_power_up(self.elapsed, held, boost) {
                Some(PowerUpState::Active { .. }) => {
                    events.push(GameEvent::BoostEnded { player: player.id });
                }
                Some(PowerUpState::Held { .. }) => {
                    events.push(GameEvent::PowerUpLapsed { player: player.id });
                }
                _ => {}
            }
        }
    }

    fn finish(&mut self, reason: EndReason, events: &mut Vec<GameEvent>) {
        self.end = Some(reason);
        let winner = self.winner();
        info!(%reason, ?winner, elapsed = self.elapsed, ticks = self.ticks, "session ended");
        events.push(GameEvent::SessionEnded { reason, winner });
    }
}
