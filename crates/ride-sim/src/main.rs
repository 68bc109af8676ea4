//! `ride-sim`: a development harness that spins up an in-process node and
//! drives it over the same `ride` JSON-RPC surface a real client would use,
//! scripting each end-to-end dispatch scenario in turn. Mirrors the
//! teacher's `xtask` layout (one `clap` subcommand per runnable scenario,
//! a `step()` banner between them) generalized from a task runner to a
//! wire-protocol scenario runner.
//!
//! A handful of things this harness reads or writes directly against the
//! store rather than over RPC: driver/rider fixtures (there is no "create
//! driver" wire method — those records belong to an upstream onboarding
//! service, out of scope per `spec.md`), OTP values (I5 forbids ever
//! putting them on the wire to the counterparty, so the harness reads them
//! the way the rider/driver app's own side-channel would), and the
//! Finalizer/AdminEarnings (there is no public "finalize" RPC; it's an
//! internal reaction to `rideCompleted`). Everything else — requesting,
//! accepting, rejecting, arriving, OTP verification, completion — goes
//! through a real `jsonrpsee` client exactly as `ride-node/tests/scenarios.rs`
//! exercises the same paths in-process, except here over an actual socket.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use jsonrpsee::server::ServerHandle;
use jsonrpsee::ws_client::WsClientBuilder;

use ride_core::booking::{BookingType, PaymentMethod};
use ride_core::ride::{FareBreakdown, Location, Otp, Ride};
use ride_core::{Driver, DriverId, Money, User, UserId, VehicleInfo};
use ride_node::Config;
use ride_rpc::{CompleteRideParams, RequestRideParams, RideApiClient, RideContext, RideRpcServer};
use ride_store::RideStore;

#[derive(Parser)]
#[command(name = "ride-sim", about = "Scenario harness for the ride-dispatch core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Two online drivers race to accept the same request; exactly one wins.
    Race,
    /// Every notified driver rejects; dispatch retries at a wider radius.
    Cascade,
    /// A stranded request outlives its wait timeout and the sweeper cancels it.
    AutoCancel,
    /// Full OTP-gated lifecycle: accept, arrive, verify-start, verify-stop, complete.
    Otp,
    /// Earnings finalization tolerates a redelivered completion without double-counting.
    Finalize,
    /// A wallet+gateway hybrid ride's fare decrease refunds the wallet portion.
    Hybrid,
    /// Runs every scenario above, in order.
    All,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Race => race().await?,
        Commands::Cascade => cascade().await?,
        Commands::AutoCancel => auto_cancel().await?,
        Commands::Otp => otp_lifecycle().await?,
        Commands::Finalize => finalize_idempotence().await?,
        Commands::Hybrid => hybrid_refund().await?,
        Commands::All => {
            race().await?;
            cascade().await?;
            auto_cancel().await?;
            otp_lifecycle().await?;
            finalize_idempotence().await?;
            hybrid_refund().await?;
        }
    }
    Ok(())
}

fn step(label: &str) {
    println!("\n=== {label} ===");
}

/// Builds a fully wired node on an ephemeral port and returns both the
/// privileged `RideContext` handle (for fixture seeding and invariant
/// checks) and the address a client should dial.
async fn spawn_node(config: Config) -> anyhow::Result<(RideContext, SocketAddr, ServerHandle)> {
    let ctx = ride_node::build_context(&config).await?;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    let handle = RideRpcServer::new(ctx.clone()).start(addr).await?;
    // jsonrpsee's accept loop needs a beat to come up after `start` returns.
    tokio::time::sleep(Duration::from_millis(20)).await;
    Ok((ctx, addr, handle))
}

fn sample_fare_inputs() -> FareBreakdown {
    FareBreakdown {
        base_fare: Money::from_major(5.0),
        distance_fare: Money::from_major(4.0),
        time_fare: Money::from_major(1.0),
        discount: Money::ZERO,
        minimum_fare: Money::from_major(10.0),
    }
}

fn seed_driver(ctx: &RideContext, lng: f64, lat: f64) -> DriverId {
    let id = DriverId::new();
    let mut driver = Driver::new(
        id,
        Location { lng, lat },
        VehicleInfo { make: "Toyota".into(), model: "Camry".into(), plate: "SIM-0001".into() },
        ride_core::now(),
    );
    driver.is_online = true;
    driver.is_active = true;
    driver.socket_id = Some(format!("sim-sock-{id}"));
    ctx.engine.store().put_driver(driver);
    id
}

fn seed_rider(ctx: &RideContext) -> UserId {
    let id = UserId::new();
    ctx.engine.store().put_user(User::new(id));
    id
}

fn request_params(rider: UserId, pickup: Location) -> RequestRideParams {
    RequestRideParams {
        rider_id: rider,
        pickup,
        dropoff: Location { lng: pickup.lng + 0.05, lat: pickup.lat + 0.05 },
        booking_type: BookingType::Instant,
        payment_method: PaymentMethod::Wallet,
        distance_km: 5.0,
        fare: Money::from_major(10.0),
        fare_inputs: sample_fare_inputs(),
    }
}

async fn race() -> anyhow::Result<()> {
    step("single-acceptance race: two drivers, exactly one winner");
    let config = Config::parse_from(["ride-sim"]);
    let (ctx, addr, _rpc_handle) = spawn_node(config).await?;
    let client = WsClientBuilder::default().build(format!("ws://{addr}")).await?;

    let rider = seed_rider(&ctx);
    let d1 = seed_driver(&ctx, 0.0072, 0.0); // ~0.8km from pickup
    let d2 = seed_driver(&ctx, 0.0108, 0.0); // ~1.2km from pickup

    let ride = client.request_ride(request_params(rider, Location { lng: 0.0, lat: 0.0 })).await?;
    println!("requested ride {}", ride.id);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let winner = client.ride_accept(ride.id, d1).await?;
    println!("driver {d1} won the race, ride status is now {:?}", winner.status);

    match client.ride_accept(ride.id, d2).await {
        Ok(_) => println!("BUG: driver {d2} also won the same ride"),
        Err(err) => println!("driver {d2} correctly lost the race: {err}"),
    }
    Ok(())
}

async fn cascade() -> anyhow::Result<()> {
    step("unanimous rejection cascade: three drivers reject, dispatch widens the search radius");
    let config = Config::parse_from(["ride-sim", "--dispatch-radii-km", "1", "--dispatch-retry-radii-km", "50"]);
    let (ctx, addr, _rpc_handle) = spawn_node(config).await?;
    let client = WsClientBuilder::default().build(format!("ws://{addr}")).await?;

    let rider = seed_rider(&ctx);
    let d1 = seed_driver(&ctx, 0.0072, 0.0); // ~0.8km, within the 1km band
    let d2 = seed_driver(&ctx, 0.0085, 0.0); // ~0.94km
    let d3 = seed_driver(&ctx, 0.0081, 0.0); // ~0.9km
    let d4 = seed_driver(&ctx, 0.18, 0.0); // ~20km, only reachable by the 50km retry band

    let ride = client.request_ride(request_params(rider, Location { lng: 0.0, lat: 0.0 })).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    for driver_id in [d1, d2, d3] {
        client.ride_reject(ride.id, driver_id).await?;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let after = ctx.engine.store().get_ride(ride.id).expect("ride still present after cascade");
    println!(
        "after cascade: status={:?} rejected_count={} retry_reached_d4={}",
        after.status,
        after.rejected_drivers.len(),
        after.notified_drivers.contains(&d4),
    );
    Ok(())
}

async fn auto_cancel() -> anyhow::Result<()> {
    step("auto-cancel sweeper: a stranded request outlives its wait timeout");
    let config = Config::parse_from([
        "ride-sim",
        "--ride-auto-cancel-timeout-minutes",
        "1",
        "--ride-auto-cancel-check-interval-minutes",
        "1",
    ]);
    let (ctx, _addr, _rpc_handle) = spawn_node(config).await?;

    let rider = seed_rider(&ctx);
    let mut ride = Ride::new(
        ride_core::RideId::new(),
        rider,
        Location { lng: 0.0, lat: 0.0 },
        Location { lng: 1.0, lat: 1.0 },
        BookingType::Instant,
        PaymentMethod::Wallet,
        5.0,
        Money::from_major(10.0),
        sample_fare_inputs(),
        Otp("0471".into()),
        Otp("9126".into()),
        ride_core::now() - 120,
    );
    ride.created_at = ride_core::now() - 120;
    ride = ctx.engine.begin_ride(ride)?;
    println!("seeded a 2-minute-old requested ride ({}) with no drivers online", ride.id);
    println!("waiting for the live sweeper task's next tick (up to ~70s)...");

    tokio::time::sleep(Duration::from_secs(70)).await;

    let after = ctx.engine.store().get_ride(ride.id).expect("ride still present");
    println!("after the sweeper tick: status={:?} reason={:?}", after.status, after.cancellation_reason);
    Ok(())
}

async fn otp_lifecycle() -> anyhow::Result<()> {
    step("OTP-gated lifecycle: accept, arrive, verify-start, start, verify-stop, complete");
    let config = Config::parse_from(["ride-sim"]);
    let (ctx, addr, _rpc_handle) = spawn_node(config).await?;
    let client = WsClientBuilder::default().build(format!("ws://{addr}")).await?;

    let rider = seed_rider(&ctx);
    let driver_id = seed_driver(&ctx, 0.0, 0.0);

    let ride = client.request_ride(request_params(rider, Location { lng: 0.0, lat: 0.0 })).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.ride_accept(ride.id, driver_id).await?;
    client.driver_arrive(ride.id, driver_id).await?;

    let start_otp = ctx.engine.store().get_ride(ride.id).unwrap().start_otp.0.clone();
    let check = client.verify_start_otp(ride.id, start_otp.clone()).await?;
    println!("start otp pre-check succeeded: {}", check.success);
    let started = client.ride_started(ride.id, start_otp).await?;
    println!("ride status after verified start: {:?}", started.status);

    let stop_otp = ctx.engine.store().get_ride(ride.id).unwrap().stop_otp.0.clone();
    let completed = client
        .ride_completed(CompleteRideParams { ride_id: ride.id, otp: stop_otp, fare_override: None })
        .await?;
    println!("ride status after verified completion: {:?}", completed.status);

    // the finalizer runs off the hot path; give its spawned task a beat.
    tokio::time::sleep(Duration::from_millis(50)).await;
    if let Some(earnings) = ctx.engine.store().get_admin_earnings(ride.id) {
        println!("earnings finalized: driver_earning={} platform_fee={}", earnings.driver_earning, earnings.platform_fee);
    }
    Ok(())
}

async fn finalize_idempotence() -> anyhow::Result<()> {
    step("finalizer idempotence: a redelivered completion must not double-count earnings");
    let config = Config::parse_from(["ride-sim"]);
    let (ctx, addr, _rpc_handle) = spawn_node(config).await?;
    let client = WsClientBuilder::default().build(format!("ws://{addr}")).await?;

    let rider = seed_rider(&ctx);
    let driver_id = seed_driver(&ctx, 0.0, 0.0);
    let ride = client.request_ride(request_params(rider, Location { lng: 0.0, lat: 0.0 })).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.ride_accept(ride.id, driver_id).await?;
    client.driver_arrive(ride.id, driver_id).await?;
    let start_otp = ctx.engine.store().get_ride(ride.id).unwrap().start_otp.0.clone();
    client.ride_started(ride.id, start_otp).await?;
    let stop_otp = ctx.engine.store().get_ride(ride.id).unwrap().stop_otp.0.clone();
    client
        .ride_completed(CompleteRideParams { ride_id: ride.id, otp: stop_otp, fare_override: None })
        .await?;

    tokio::time::sleep(Duration::from_millis(100)).await;
    let first = ctx.engine.store().get_admin_earnings(ride.id).expect("the spawned finalizer already ran once");

    // A redelivered `rideCompleted` webhook can't be replayed through the
    // RPC surface itself (the state machine rejects a second completion of
    // an already-completed ride outright) so this calls the Finalizer a
    // second time directly, the same redelivery `ride-node/tests` checks.
    ctx.finalizer.finalize(ride.id).await?;
    let second = ctx.engine.store().get_admin_earnings(ride.id).expect("earnings row still present");

    let idempotent = first.driver_earning == second.driver_earning && first.platform_fee == second.platform_fee;
    println!(
        "first: driver_earning={} platform_fee={}\nsecond: driver_earning={} platform_fee={}\nidempotent: {idempotent}",
        first.driver_earning, first.platform_fee, second.driver_earning, second.platform_fee,
    );
    Ok(())
}

async fn hybrid_refund() -> anyhow::Result<()> {
    step("hybrid wallet+gateway payment: a fare decrease refunds the wallet portion");
    let config = Config::parse_from(["ride-sim"]);
    let (ctx, addr, _rpc_handle) = spawn_node(config).await?;
    let client = WsClientBuilder::default().build(format!("ws://{addr}")).await?;

    let rider = UserId::new();
    let mut user = User::new(rider);
    user.wallet_balance = Money::from_major(500.0);
    ctx.engine.store().put_user(user);
    let driver_id = seed_driver(&ctx, 0.0, 0.0);

    let params = RequestRideParams {
        rider_id: rider,
        pickup: Location { lng: 0.0, lat: 0.0 },
        dropoff: Location { lng: 1.0, lat: 1.0 },
        booking_type: BookingType::Instant,
        payment_method: PaymentMethod::Wallet,
        distance_km: 5.0,
        fare: Money::from_major(300.0),
        fare_inputs: FareBreakdown {
            base_fare: Money::from_major(90.0),
            distance_fare: Money::from_major(150.0),
            time_fare: Money::ZERO,
            discount: Money::ZERO,
            minimum_fare: Money::from_major(60.0),
        },
    };
    let ride = client.request_ride(params).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.ride_accept(ride.id, driver_id).await?;
    client.driver_arrive(ride.id, driver_id).await?;
    let start_otp = ctx.engine.store().get_ride(ride.id).unwrap().start_otp.0.clone();
    client.ride_started(ride.id, start_otp).await?;

    // The hybrid wallet/gateway split is authorized upstream of this crate,
    // before the ride even starts (`spec.md` §1 treats the payment gateway
    // as opaque); the harness writes the already-authorized split straight
    // onto the durable record the way that upstream step would, rather than
    // inventing a wire method this crate doesn't own.
    let mut mid_ride = ctx.engine.store().get_ride(ride.id).unwrap();
    mid_ride.wallet_amount_used = Money::from_major(100.0);
    mid_ride.gateway_amount_paid = Money::from_major(200.0);
    mid_ride.gateway_payment_id = Some("sim-gateway-ref".into());
    ctx.engine.store().put_ride(mid_ride);

    let stop_otp = ctx.engine.store().get_ride(ride.id).unwrap().stop_otp.0.clone();
    client
        .ride_completed(CompleteRideParams { ride_id: ride.id, otp: stop_otp, fare_override: None })
        .await?;

    tokio::time::sleep(Duration::from_millis(100)).await;
    let after_ride = ctx.engine.store().get_ride(ride.id).unwrap();
    let earnings = ctx.engine.store().get_admin_earnings(ride.id).unwrap();
    println!(
        "recomputed fare={} (requested as {:.2}); split satisfies invariant: {}",
        after_ride.fare,
        300.0,
        earnings.satisfies_split_invariant(),
    );
    Ok(())
}
