//! Borrows, returns and retires resources, mirroring the README example.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use striped_pool::{ResourceManager, StripedPool};

/// Stands in for something expensive, like a connection factory.
struct TicketManager {
    next: AtomicU32,
}

impl ResourceManager for TicketManager {
    type Resource = u32;
    type Error = std::convert::Infallible;

    fn create(&self) -> Result<u32, Self::Error> {
        Ok(self.next.fetch_add(1, Ordering::Relaxed))
    }

    fn destroy(&self, ticket: u32) -> Result<(), Self::Error> {
        println!("destroying ticket {ticket}");
        Ok(())
    }
}

fn main() {
    let pool = StripedPool::builder(TicketManager {
        next: AtomicU32::new(0),
    })
    .max_resources(4)
    .stripes(1)
    .idle_timeout(Duration::from_secs(30))
    .build()
    .unwrap();

    let (ticket, stripe) = spin_on::spin_on(pool.acquire()).unwrap();
    println!("borrowed ticket {ticket} from stripe {}", stripe.index());

    stripe.put(ticket);

    let (reused, stripe) = spin_on::spin_on(pool.acquire()).unwrap();
    println!("borrowed ticket {reused} again from stripe {}", stripe.index());
    assert_eq!(reused, ticket);

    // Retire the resource instead of returning it.
    stripe.destroy(reused);

    // Flush whatever is still cached before shutting down.
    pool.destroy_all();
}
