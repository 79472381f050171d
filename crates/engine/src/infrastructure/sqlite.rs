//! SQLite-backed world, player and item storage.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tickmud_domain::{
    Area, AreaId, Direction, Item, ItemId, Mob, MobId, Player, PlayerId, Room, RoomId, Vitals,
};
use uuid::Uuid;

use crate::infrastructure::ports::{ItemStore, PlayerStore, RepoError, WorldStore};

/// Store over a single SQLite database holding the whole world.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `url` (e.g. `sqlite://tickmud.db?mode=rwc`) and create missing tables.
    pub async fn connect(url: &str) -> Result<Self, RepoError> {
        let pool = SqlitePool::connect(url)
            .await
            .map_err(|e| RepoError::database("connect", e))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), RepoError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS areas (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT ''
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS rooms (
                id TEXT PRIMARY KEY,
                area_id TEXT NOT NULL REFERENCES areas(id),
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT ''
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_rooms_area ON rooms(area_id)",
            r#"
            CREATE TABLE IF NOT EXISTS room_exits (
                room_id TEXT NOT NULL,
                direction TEXT NOT NULL,
                target_id TEXT NOT NULL,
                PRIMARY KEY (room_id, direction)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                room_id TEXT,
                owner_id TEXT,
                equipped INTEGER NOT NULL DEFAULT 0
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_items_room ON items(room_id)",
            "CREATE INDEX IF NOT EXISTS idx_items_owner ON items(owner_id)",
            r#"
            CREATE TABLE IF NOT EXISTS mobs (
                id TEXT PRIMARY KEY,
                room_id TEXT NOT NULL,
                name TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS players (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                room_id TEXT NOT NULL,
                area_id TEXT NOT NULL,
                health INTEGER NOT NULL,
                max_health INTEGER NOT NULL,
                movement INTEGER NOT NULL,
                max_movement INTEGER NOT NULL,
                is_admin INTEGER NOT NULL DEFAULT 0,
                online INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| RepoError::database("ensure_schema", e))?;
        }
        Ok(())
    }

    /// Nobody is online right after startup, whatever the last run left behind.
    pub async fn reset_online(&self) -> Result<u64, RepoError> {
        let result = sqlx::query("UPDATE players SET online = 0 WHERE online = 1")
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("reset_online", e))?;
        Ok(result.rows_affected())
    }

    /// Insert a small two-area world if the database has no areas yet.
    ///
    /// Returns true if anything was written.
    pub async fn seed_demo_world(&self) -> Result<bool, RepoError> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM areas")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::database("seed_demo_world", e))?;
        if existing > 0 {
            return Ok(false);
        }

        let world = demo::world();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("seed_demo_world", e))?;

        for area in &world.areas {
            sqlx::query("INSERT INTO areas (id, name, description) VALUES (?, ?, ?)")
                .bind(area.id.to_string())
                .bind(&area.name)
                .bind(&area.description)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepoError::database("seed_demo_world", e))?;
        }
        for room in &world.rooms {
            sqlx::query("INSERT INTO rooms (id, area_id, name, description) VALUES (?, ?, ?, ?)")
                .bind(room.id.to_string())
                .bind(room.area_id.to_string())
                .bind(&room.name)
                .bind(&room.description)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepoError::database("seed_demo_world", e))?;
            for (direction, target) in &room.exits {
                sqlx::query(
                    "INSERT INTO room_exits (room_id, direction, target_id) VALUES (?, ?, ?)",
                )
                .bind(room.id.to_string())
                .bind(direction.as_str())
                .bind(target.to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| RepoError::database("seed_demo_world", e))?;
            }
        }
        for (room_id, item) in &world.items {
            sqlx::query("INSERT INTO items (id, name, room_id, equipped) VALUES (?, ?, ?, 0)")
                .bind(item.id.to_string())
                .bind(&item.name)
                .bind(room_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| RepoError::database("seed_demo_world", e))?;
        }
        for (room_id, mob) in &world.mobs {
            sqlx::query("INSERT INTO mobs (id, room_id, name) VALUES (?, ?, ?)")
                .bind(mob.id.to_string())
                .bind(room_id.to_string())
                .bind(&mob.name)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepoError::database("seed_demo_world", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::database("seed_demo_world", e))?;
        tracing::info!(
            areas = world.areas.len(),
            rooms = world.rooms.len(),
            "Seeded demo world"
        );
        Ok(true)
    }

    async fn exits_for(
        &self,
        sql: &'static str,
        key: String,
    ) -> Result<HashMap<RoomId, Vec<(Direction, RoomId)>>, RepoError> {
        let rows = sqlx::query(sql)
            .bind(key)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("list_exits", e))?;

        let mut exits: HashMap<RoomId, Vec<(Direction, RoomId)>> = HashMap::new();
        for row in rows {
            let room_id: RoomId = parse_column(&row, "room_id")?;
            let direction: String = column(&row, "direction")?;
            let direction = Direction::from_str(&direction)
                .map_err(|e| RepoError::serialization(format!("room {room_id}: {e}")))?;
            let target: RoomId = parse_column(&row, "target_id")?;
            exits.entry(room_id).or_default().push((direction, target));
        }
        Ok(exits)
    }
}

#[async_trait]
impl WorldStore for SqliteStore {
    async fn list_areas(&self) -> Result<Vec<Area>, RepoError> {
        let rows = sqlx::query("SELECT id, name, description FROM areas ORDER BY rowid")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("list_areas", e))?;

        rows.iter()
            .map(|row| -> Result<Area, RepoError> {
                Ok(Area::new(column::<String>(row, "name")?)
                    .with_id(parse_column(row, "id")?)
                    .with_description(column::<String>(row, "description")?))
            })
            .collect()
    }

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, RepoError> {
        let row = sqlx::query("SELECT id, area_id, name, description FROM rooms WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("get_room", e))?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut room = room_from_row(&row)?;
        let mut exits = self
            .exits_for(
                "SELECT room_id, direction, target_id FROM room_exits WHERE room_id = ?",
                id.to_string(),
            )
            .await?;
        room.exits.extend(exits.remove(&id).unwrap_or_default());
        Ok(Some(room))
    }

    async fn count_rooms_in_area(&self, area_id: AreaId) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rooms WHERE area_id = ?")
            .bind(area_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::database("count_rooms_in_area", e))?;
        Ok(count.max(0) as u64)
    }

    async fn list_rooms_in_area(&self, area_id: AreaId) -> Result<Vec<Room>, RepoError> {
        let rows = sqlx::query(
            "SELECT id, area_id, name, description FROM rooms WHERE area_id = ? ORDER BY rowid",
        )
        .bind(area_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("list_rooms_in_area", e))?;

        let mut exits = self
            .exits_for(
                r#"
                SELECT e.room_id, e.direction, e.target_id
                FROM room_exits e JOIN rooms r ON r.id = e.room_id
                WHERE r.area_id = ?
                "#,
                area_id.to_string(),
            )
            .await?;

        rows.iter()
            .map(|row| -> Result<Room, RepoError> {
                let mut room = room_from_row(row)?;
                room.exits.extend(exits.remove(&room.id).unwrap_or_default());
                Ok(room)
            })
            .collect()
    }

    async fn list_items_in_room(&self, room_id: RoomId) -> Result<Vec<Item>, RepoError> {
        let rows =
            sqlx::query("SELECT id, name, equipped FROM items WHERE room_id = ? ORDER BY rowid")
                .bind(room_id.to_string())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| RepoError::database("list_items_in_room", e))?;
        rows.iter().map(item_from_row).collect()
    }

    async fn list_mobs_in_room(&self, room_id: RoomId) -> Result<Vec<Mob>, RepoError> {
        let rows = sqlx::query("SELECT id, name FROM mobs WHERE room_id = ? ORDER BY rowid")
            .bind(room_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("list_mobs_in_room", e))?;

        rows.iter()
            .map(|row| -> Result<Mob, RepoError> {
                Ok(Mob {
                    id: parse_column::<MobId>(row, "id")?,
                    name: column(row, "name")?,
                })
            })
            .collect()
    }

    async fn list_players_in_room(&self, room_id: RoomId) -> Result<Vec<PlayerId>, RepoError> {
        let rows = sqlx::query("SELECT id FROM players WHERE room_id = ? AND online = 1")
            .bind(room_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("list_players_in_room", e))?;
        rows.iter().map(|row| parse_column(row, "id")).collect()
    }
}

#[async_trait]
impl PlayerStore for SqliteStore {
    async fn get_player_by_name(&self, name: &str) -> Result<Option<Player>, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, room_id, area_id, health, max_health, movement, max_movement, is_admin
            FROM players WHERE name = ? COLLATE NOCASE
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("get_player_by_name", e))?;
        let Some(row) = row else {
            return Ok(None);
        };

        let player = Player {
            id: parse_column(&row, "id")?,
            name: column(&row, "name")?,
            room_id: parse_column(&row, "room_id")?,
            area_id: parse_column(&row, "area_id")?,
            vitals: Vitals {
                health: column(&row, "health")?,
                max_health: column(&row, "max_health")?,
                movement: column(&row, "movement")?,
                max_movement: column(&row, "max_movement")?,
            },
            inventory: Vec::new(),
            is_admin: column(&row, "is_admin")?,
        };
        let inventory = self.list_inventory(player.id).await?;
        Ok(Some(Player { inventory, ..player }))
    }

    async fn create_player(&self, player: &Player) -> Result<(), RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("create_player", e))?;

        sqlx::query(
            r#"
            INSERT INTO players
                (id, name, room_id, area_id, health, max_health, movement, max_movement,
                 is_admin, online, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(player.id.to_string())
        .bind(&player.name)
        .bind(player.room_id.to_string())
        .bind(player.area_id.to_string())
        .bind(player.vitals.health)
        .bind(player.vitals.max_health)
        .bind(player.vitals.movement)
        .bind(player.vitals.max_movement)
        .bind(player.is_admin)
        .bind(now())
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::constraint(format!("player name '{}' is taken", player.name))
            }
            other => RepoError::database("create_player", other),
        })?;

        for item in &player.inventory {
            sqlx::query("INSERT INTO items (id, name, owner_id, equipped) VALUES (?, ?, ?, ?)")
                .bind(item.id.to_string())
                .bind(&item.name)
                .bind(player.id.to_string())
                .bind(item.equipped)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepoError::database("create_player", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::database("create_player", e))
    }

    async fn set_player_location(
        &self,
        id: PlayerId,
        room_id: RoomId,
        area_id: AreaId,
    ) -> Result<(), RepoError> {
        let result =
            sqlx::query("UPDATE players SET room_id = ?, area_id = ?, updated_at = ? WHERE id = ?")
                .bind(room_id.to_string())
                .bind(area_id.to_string())
                .bind(now())
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| RepoError::database("set_player_location", e))?;
        require_row(result.rows_affected(), "Player", id)
    }

    async fn save_vitals(&self, id: PlayerId, vitals: &Vitals) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE players
            SET health = ?, max_health = ?, movement = ?, max_movement = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(vitals.health)
        .bind(vitals.max_health)
        .bind(vitals.movement)
        .bind(vitals.max_movement)
        .bind(now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("save_vitals", e))?;
        require_row(result.rows_affected(), "Player", id)
    }

    async fn set_online(&self, id: PlayerId, online: bool) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE players SET online = ?, updated_at = ? WHERE id = ?")
            .bind(online)
            .bind(now())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("set_online", e))?;
        require_row(result.rows_affected(), "Player", id)
    }
}

#[async_trait]
impl ItemStore for SqliteStore {
    async fn list_inventory(&self, player_id: PlayerId) -> Result<Vec<Item>, RepoError> {
        let rows =
            sqlx::query("SELECT id, name, equipped FROM items WHERE owner_id = ? ORDER BY rowid")
                .bind(player_id.to_string())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| RepoError::database("list_inventory", e))?;
        rows.iter().map(item_from_row).collect()
    }

    async fn move_item_to_player(
        &self,
        item_id: ItemId,
        player_id: PlayerId,
    ) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE items SET owner_id = ?, room_id = NULL, equipped = 0 WHERE id = ?",
        )
        .bind(player_id.to_string())
        .bind(item_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("move_item_to_player", e))?;
        require_row(result.rows_affected(), "Item", item_id)
    }

    async fn move_item_to_room(&self, item_id: ItemId, room_id: RoomId) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE items SET room_id = ?, owner_id = NULL, equipped = 0 WHERE id = ?",
        )
        .bind(room_id.to_string())
        .bind(item_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("move_item_to_room", e))?;
        require_row(result.rows_affected(), "Item", item_id)
    }

    async fn set_equipped(&self, item_id: ItemId, equipped: bool) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE items SET equipped = ? WHERE id = ?")
            .bind(equipped)
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("set_equipped", e))?;
        require_row(result.rows_affected(), "Item", item_id)
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn require_row(affected: u64, entity_type: &'static str, id: impl ToString) -> Result<(), RepoError> {
    if affected == 0 {
        return Err(RepoError::not_found(entity_type, id));
    }
    Ok(())
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepoError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| RepoError::serialization(format!("column {name}: {e}")))
}

fn parse_column<T>(row: &SqliteRow, name: &str) -> Result<T, RepoError>
where
    T: From<Uuid>,
{
    let raw: String = column(row, name)?;
    Uuid::parse_str(&raw)
        .map(T::from)
        .map_err(|e| RepoError::serialization(format!("column {name}: {e}")))
}

fn room_from_row(row: &SqliteRow) -> Result<Room, RepoError> {
    let area_id: AreaId = parse_column(row, "area_id")?;
    Ok(Room::new(area_id, column::<String>(row, "name")?)
        .with_id(parse_column(row, "id")?)
        .with_description(column::<String>(row, "description")?))
}

fn item_from_row(row: &SqliteRow) -> Result<Item, RepoError> {
    let mut item = Item::new(column::<String>(row, "name")?).with_id(parse_column(row, "id")?);
    item.equipped = column(row, "equipped")?;
    Ok(item)
}

/// Fixed-id demo content so `START_ROOM` stays stable across fresh databases.
pub mod demo {
    use tickmud_domain::{Area, AreaId, Direction, Item, ItemId, Mob, MobId, Room, RoomId};
    use uuid::Uuid;

    pub const TOWN: Uuid = Uuid::from_u128(0x7d1c_0000_0000_4000_8000_0000_0000_0001);
    pub const FOREST: Uuid = Uuid::from_u128(0x7d1c_0000_0000_4000_8000_0000_0000_0002);
    pub const SQUARE: Uuid = Uuid::from_u128(0x7d1c_0000_0000_4000_8000_0000_0000_0101);
    pub const GATE: Uuid = Uuid::from_u128(0x7d1c_0000_0000_4000_8000_0000_0000_0102);
    pub const TAVERN: Uuid = Uuid::from_u128(0x7d1c_0000_0000_4000_8000_0000_0000_0103);
    pub const PATH: Uuid = Uuid::from_u128(0x7d1c_0000_0000_4000_8000_0000_0000_0201);
    pub const CLEARING: Uuid = Uuid::from_u128(0x7d1c_0000_0000_4000_8000_0000_0000_0202);

    pub struct DemoWorld {
        pub areas: Vec<Area>,
        pub rooms: Vec<Room>,
        pub items: Vec<(RoomId, Item)>,
        pub mobs: Vec<(RoomId, Mob)>,
    }

    pub fn start_room() -> RoomId {
        RoomId::from_uuid(SQUARE)
    }

    pub fn world() -> DemoWorld {
        let town = AreaId::from_uuid(TOWN);
        let forest = AreaId::from_uuid(FOREST);
        let square = RoomId::from_uuid(SQUARE);
        let gate = RoomId::from_uuid(GATE);
        let tavern = RoomId::from_uuid(TAVERN);
        let path = RoomId::from_uuid(PATH);
        let clearing = RoomId::from_uuid(CLEARING);

        let areas = vec![
            Area::new("Town").with_id(town).with_description("A walled market town."),
            Area::new("Forest").with_id(forest).with_description("Old woods east of town."),
        ];
        let rooms = vec![
            Room::new(town, "Town Square")
                .with_id(square)
                .with_description("Cobbles, a dry fountain and a notice board.")
                .with_exit(Direction::North, gate)
                .with_exit(Direction::East, tavern),
            Room::new(town, "East Gate")
                .with_id(gate)
                .with_description("The gate stands open onto a forest road.")
                .with_exit(Direction::South, square)
                .with_exit(Direction::East, path),
            Room::new(town, "The Leaky Tankard")
                .with_id(tavern)
                .with_description("Low beams and the smell of spilled ale.")
                .with_exit(Direction::West, square),
            Room::new(forest, "Forest Path")
                .with_id(path)
                .with_description("A rutted track between tall pines.")
                .with_exit(Direction::West, gate)
                .with_exit(Direction::North, clearing),
            Room::new(forest, "Clearing")
                .with_id(clearing)
                .with_description("Sunlight falls on a ring of mossy stones. A steep slope drops away.")
                .with_exit(Direction::South, path)
                .with_exit(Direction::Down, square),
        ];
        let items = vec![
            (
                square,
                Item::new("a brass lamp").with_id(ItemId::from_uuid(Uuid::from_u128(0x7d1c_0301))),
            ),
            (
                tavern,
                Item::new("a wooden shield").with_id(ItemId::from_uuid(Uuid::from_u128(0x7d1c_0302))),
            ),
        ];
        let mobs = vec![
            (
                square,
                Mob {
                    id: MobId::from_uuid(Uuid::from_u128(0x7d1c_0401)),
                    name: "a stray dog".to_string(),
                },
            ),
            (
                clearing,
                Mob {
                    id: MobId::from_uuid(Uuid::from_u128(0x7d1c_0402)),
                    name: "a red fox".to_string(),
                },
            ),
        ];

        DemoWorld {
            areas,
            rooms,
            items,
            mobs,
        }
    }
}
