use alloy::hex::ToHexExt;
use alloy::primitives::Address;
use anyhow::Result;
use tracing::{info, warn};

use crate::cache::Batch;
use crate::entities::{Arbitrator, User};
use crate::events::UserEvent;
use crate::store::Store;

/// Applies a profile event from the data contract. Registration counts once
/// per address on the marketplace row; registering again only refreshes the
/// profile fields.
pub async fn apply<S: Store>(
    batch: &mut Batch<'_, S>,
    marketplace: Address,
    event: UserEvent,
    timestamp: u64,
) -> Result<()> {
    match event {
        UserEvent::UserRegistered {
            address,
            public_key,
            name,
            bio,
            avatar,
        } => {
            let existing = batch.user(address).await?;
            let is_new = existing.is_none();

            let mut user = existing.unwrap_or_else(|| User::new(address, timestamp));
            user.public_key = public_key.encode_hex_with_prefix();
            user.name = name;
            user.bio = bio;
            user.avatar = avatar;
            batch.put_user(user);

            if is_new {
                let mut marketplace = batch.marketplace(marketplace).await?;
                marketplace.user_count += 1;
                batch.put_marketplace(marketplace);
            }

            info!(%address, "user registered");
        }
        UserEvent::UserUpdated {
            address,
            name,
            bio,
            avatar,
        } => match batch.user(address).await? {
            Some(mut user) => {
                user.name = name;
                user.bio = bio;
                user.avatar = avatar;
                batch.put_user(user);
            }
            None => warn!(%address, "profile update for an unregistered user, skipping"),
        },
        UserEvent::ArbitratorRegistered {
            address,
            public_key,
            name,
            bio,
            avatar,
            fee,
        } => {
            let existing = batch.arbitrator(address).await?;
            let is_new = existing.is_none();

            let mut arbitrator = existing.unwrap_or_else(|| Arbitrator::new(address, timestamp));
            arbitrator.public_key = public_key.encode_hex_with_prefix();
            arbitrator.name = name;
            arbitrator.bio = bio;
            arbitrator.avatar = avatar;
            arbitrator.fee = fee;
            batch.put_arbitrator(arbitrator);

            if is_new {
                let mut marketplace = batch.marketplace(marketplace).await?;
                marketplace.arbitrator_count += 1;
                batch.put_marketplace(marketplace);
            }

            info!(%address, "arbitrator registered");
        }
        UserEvent::ArbitratorUpdated {
            address,
            name,
            bio,
            avatar,
        } => match batch.arbitrator(address).await? {
            Some(mut arbitrator) => {
                arbitrator.name = name;
                arbitrator.bio = bio;
                arbitrator.avatar = avatar;
                batch.put_arbitrator(arbitrator);
            }
            None => warn!(%address, "profile update for an unregistered arbitrator, skipping"),
        },
    }

    Ok(())
}
