//! The Event Bus / Room Router (`spec.md` §4.8).
//!
//! Rooms (`user_{id}`, `driver_{id}`, `ride_{id}`, `admin`) are the unit of
//! fan-out. A `tokio::sync::broadcast` channel stands in for the
//! cross-instance pub/sub backplane: every node subscribes to it, so an
//! emission published on this node reaches every room-subscribed connection
//! on this node, and — in a real multi-node deployment — a thin adapter
//! would relay the same `RoomEvent` onto a Redis/NATS topic so other nodes'
//! `Bus` instances observe it too (see `DESIGN.md` for why this is a
//! deliberate single-node stand-in rather than a fabricated dependency).

use crate::connection::{ConnectionId, ConnectionIdentity};
use dashmap::DashMap;
use ride_core::events::rooms;
use ride_core::{DriverId, OutboundEvent, Participant, RideId, UserId};
use ride_store::RideStore;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

#[derive(Clone, Debug)]
pub struct RoomEvent {
    pub room: String,
    pub event: OutboundEvent,
}

struct ConnectionState {
    identity: ConnectionIdentity,
    socket_id: String,
    outbound: mpsc::UnboundedSender<OutboundEvent>,
}

pub struct Bus {
    store: Arc<dyn RideStore>,
    rooms: DashMap<String, HashSet<ConnectionId>>,
    connections: DashMap<ConnectionId, ConnectionState>,
    /// Maps a durable `socket_id` (as stored on `Driver`/`User`) back to the
    /// live connection, for the direct-emission fallback of §4.8.
    sockets: DashMap<String, ConnectionId>,
    backplane: broadcast::Sender<RoomEvent>,
}

impl Bus {
    pub fn new(store: Arc<dyn RideStore>) -> Self {
        let (backplane, _) = broadcast::channel(4096);
        Self {
            store,
            rooms: DashMap::new(),
            connections: DashMap::new(),
            sockets: DashMap::new(),
            backplane,
        }
    }

    pub fn subscribe_backplane(&self) -> broadcast::Receiver<RoomEvent> {
        self.backplane.subscribe()
    }

    /// Registers a newly-accepted connection and returns its outbound
    /// receiver for the transport layer to pump over the socket.
    pub fn register(
        &self,
        identity: ConnectionIdentity,
        socket_id: String,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<OutboundEvent>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.insert(id, ConnectionState { identity, socket_id: socket_id.clone(), outbound: tx });
        self.sockets.insert(socket_id, id);
        self.auto_join_identity_room(id, identity);
        self.rejoin_active_rides(id, identity);
        (id, rx)
    }

    pub fn unregister(&self, connection_id: ConnectionId) {
        if let Some((_, state)) = self.connections.remove(&connection_id) {
            self.sockets.remove(&state.socket_id);
        }
        for mut room in self.rooms.iter_mut() {
            room.remove(&connection_id);
        }
    }

    fn auto_join_identity_room(&self, connection_id: ConnectionId, identity: ConnectionIdentity) {
        match identity {
            ConnectionIdentity::Rider(id) => self.join_room(connection_id, &rooms::user(id)),
            ConnectionIdentity::Driver(id) => self.join_room(connection_id, &rooms::driver(id)),
            ConnectionIdentity::Admin => self.join_room(connection_id, rooms::ADMIN),
        }
    }

    /// §4.8 reconnection bookkeeping: auto-join every active ride room
    /// involving this identity.
    fn rejoin_active_rides(&self, connection_id: ConnectionId, identity: ConnectionIdentity) {
        let rides = match identity {
            ConnectionIdentity::Rider(user_id) => self.store.active_rides_for_user(user_id),
            ConnectionIdentity::Driver(driver_id) => self.store.active_rides_for_driver(driver_id),
            ConnectionIdentity::Admin => Vec::new(),
        };
        for ride in rides {
            self.join_room(connection_id, &rooms::ride(ride.id));
        }
    }

    pub fn join_room(&self, connection_id: ConnectionId, room: &str) {
        self.rooms.entry(room.to_string()).or_default().insert(connection_id);
    }

    pub fn leave_room(&self, connection_id: ConnectionId, room: &str) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(&connection_id);
        }
    }

    /// Force-joins both parties into `ride_{rideId}` server-side (§4.3 step
    /// 5), required because clients may not yet have subscribed.
    pub fn force_join_ride_room(&self, ride_id: RideId, connection_ids: &[ConnectionId]) {
        let room = rooms::ride(ride_id);
        for &id in connection_ids {
            self.join_room(id, &room);
        }
    }

    pub fn connection_for_socket(&self, socket_id: &str) -> Option<ConnectionId> {
        self.sockets.get(socket_id).map(|id| *id)
    }

    /// Publishes to every local subscriber of `room` and relays onto the
    /// cross-instance backplane so other nodes' rooms fan out too.
    pub fn emit_to_room(&self, room: &str, event: OutboundEvent) {
        self.publish_local(room, &event);
        let _ = self.backplane.send(RoomEvent { room: room.to_string(), event });
    }

    fn publish_local(&self, room: &str, event: &OutboundEvent) {
        let Some(members) = self.rooms.get(room) else { return };
        for connection_id in members.iter() {
            if let Some(state) = self.connections.get(connection_id) {
                let _ = state.outbound.send(event.clone());
            }
        }
    }

    /// Direct-emission fallback: when a cached socket id exists, emit both
    /// to the room and to the socket, for resilience during room-membership
    /// race windows (§4.8).
    pub fn emit_direct(&self, socket_id: &str, event: OutboundEvent) {
        if let Some(connection_id) = self.connection_for_socket(socket_id) {
            if let Some(state) = self.connections.get(&connection_id) {
                let _ = state.outbound.send(event);
            }
        }
    }

    /// §4.8 authorization: for any event referencing a `rideId`, the caller
    /// must be the rider or the assigned driver of that ride.
    pub fn authorize_ride_event(&self, caller: Participant, ride_id: RideId) -> bool {
        let Some(ride) = self.store.get_ride(ride_id) else { return false };
        match caller {
            Participant::Rider(user_id) => ride.rider_id == user_id,
            Participant::Driver(driver_id) => ride.driver_id == Some(driver_id),
        }
    }

    pub fn identity_of(&self, connection_id: ConnectionId) -> Option<ConnectionIdentity> {
        self.connections.get(&connection_id).map(|s| s.identity)
    }

    /// The durable socket id a connection registered under, for handlers
    /// that need to reply to the caller directly via `emit_direct` rather
    /// than broadcasting to a room.
    pub fn socket_id_of(&self, connection_id: ConnectionId) -> Option<String> {
        self.connections.get(&connection_id).map(|s| s.socket_id.clone())
    }
}

// Re-exported so callers building room names don't need to depend on
// `ride_core::events` directly.
pub use ride_core::events::rooms as room_names;

#[cfg(test)]
mod tests {
    use super::*;
    use ride_core::ride::{Location, Otp, Ride};
    use ride_core::{BookingType, Money, PaymentMethod};
    use ride_store::MemRideStore;

    fn sample_fare_inputs() -> ride_core::ride::FareBreakdown {
        ride_core::ride::FareBreakdown {
            base_fare: Money::from_major(5.0),
            distance_fare: Money::from_major(4.0),
            time_fare: Money::from_major(1.0),
            discount: Money::ZERO,
            minimum_fare: Money::from_major(10.0),
        }
    }

    fn sample_ride(rider: UserId, driver: Option<DriverId>) -> Ride {
        let mut ride = Ride::new(
            RideId::new(),
            rider,
            Location { lng: 0.0, lat: 0.0 },
            Location { lng: 1.0, lat: 1.0 },
            BookingType::Instant,
            PaymentMethod::Wallet,
            5.0,
            Money::from_major(10.0),
            sample_fare_inputs(),
            Otp("0000".into()),
            Otp("1111".into()),
            0,
        );
        ride.driver_id = driver;
        if driver.is_some() {
            ride.status = ride_core::RideStatus::Accepted;
        }
        ride
    }

    #[test]
    fn emit_to_room_reaches_only_members() {
        let store = Arc::new(MemRideStore::new());
        let bus = Bus::new(store);
        let rider = UserId::new();
        let (conn_a, mut rx_a) = bus.register(ConnectionIdentity::Rider(rider), "sock-a".into());
        let (_conn_b, mut rx_b) = bus.register(ConnectionIdentity::Rider(UserId::new()), "sock-b".into());

        bus.emit_to_room(&rooms::user(rider), OutboundEvent::NoDriverFound {
            ride_id: RideId::new(),
            reason: "test".into(),
        });

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
        let _ = conn_a;
    }

    #[test]
    fn reconnect_rejoins_active_ride_room() {
        let store = Arc::new(MemRideStore::new());
        let rider = UserId::new();
        let driver = DriverId::new();
        let ride = sample_ride(rider, Some(driver));
        store.put_ride(ride.clone());

        let bus = Bus::new(store);
        let (conn, mut rx) = bus.register(ConnectionIdentity::Rider(rider), "sock-r".into());
        bus.emit_to_room(&rooms::ride(ride.id), OutboundEvent::RideStarted { ride_id: ride.id });
        assert!(rx.try_recv().is_ok());
        let _ = conn;
    }

    #[test]
    fn authorize_ride_event_rejects_unrelated_caller() {
        let store = Arc::new(MemRideStore::new());
        let rider = UserId::new();
        let driver = DriverId::new();
        let ride = sample_ride(rider, Some(driver));
        store.put_ride(ride.clone());
        let bus = Bus::new(store);

        assert!(bus.authorize_ride_event(Participant::Rider(rider), ride.id));
        assert!(bus.authorize_ride_event(Participant::Driver(driver), ride.id));
        assert!(!bus.authorize_ride_event(Participant::Driver(DriverId::new()), ride.id));
    }

    #[test]
    fn direct_emission_fallback_reaches_socket_outside_room() {
        let store = Arc::new(MemRideStore::new());
        let bus = Bus::new(store);
        let (_conn, mut rx) = bus.register(ConnectionIdentity::Driver(DriverId::new()), "sock-d".into());
        bus.emit_direct("sock-d", OutboundEvent::RideNoLongerAvailable { ride_id: RideId::new() });
        assert!(rx.try_recv().is_ok());
    }
}
