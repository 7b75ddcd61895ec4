//! The substratekitties runtime module

use super::runtime::Ext;
use crate::chain::call::KittiesCall;
use crate::chain::types::{Auction, Balance, BlockNumber, Event, Hash, Kitty};
use crate::crypto::AccountId;
use crate::error::{ensure, KittyError, Result};
use tracing::warn;

impl Ext<'_> {
    pub(super) fn dispatch_kitties(&mut self, sender: AccountId, call: KittiesCall) -> Result<()> {
        match call {
            KittiesCall::CreateKitty => self.create_kitty(sender),
            KittiesCall::SetPrice {
                kitty_id,
                new_price,
            } => self.set_price(sender, kitty_id, new_price),
            KittiesCall::Transfer { to, kitty_id } => {
                let owner = self.owner_of(&kitty_id)?;
                ensure(owner == sender, "You do not own this kitty")?;
                self.transfer_from(sender, to, kitty_id)
            }
            KittiesCall::BuyKitty {
                kitty_id,
                max_price,
            } => self.buy_kitty(sender, kitty_id, max_price),
            KittiesCall::CreateAuction {
                kitty_id,
                min_bid,
                expiry,
            } => self.create_auction(sender, kitty_id, min_bid, expiry),
            KittiesCall::PredefinedCreateAuction { kitty_id, min_bid } => {
                let expiry = self.env.number + self.env.auction_period;
                self.create_auction(sender, kitty_id, min_bid, expiry)
            }
            KittiesCall::BidAuction { kitty_id, bid } => self.bid_auction(sender, kitty_id, bid),
            KittiesCall::BreedKitty {
                kitty_id_1,
                kitty_id_2,
            } => self.breed_kitty(sender, kitty_id_1, kitty_id_2),
        }
    }

    fn random_hash(&self, sender: &AccountId) -> Result<Hash> {
        let nonce = self.state.kitties.nonce;
        Ok(Hash::of(&bincode::serialize(&(
            self.env.random_seed,
            sender,
            nonce,
        ))?))
    }

    fn owner_of(&self, kitty_id: &Hash) -> Result<AccountId> {
        self.state
            .kitties
            .owner_of(kitty_id)
            .ok_or(KittyError::Dispatch("No owner for this kitty"))
    }

    fn kitty(&self, kitty_id: &Hash, missing: &'static str) -> Result<Kitty> {
        self.state
            .kitties
            .kitty(kitty_id)
            .cloned()
            .ok_or(KittyError::Dispatch(missing))
    }

    fn create_kitty(&mut self, sender: AccountId) -> Result<()> {
        let id = self.random_hash(&sender)?;
        let kitty = Kitty {
            id,
            dna: id,
            price: 0,
            gen: 0,
        };
        self.mint(sender, id, kitty)?;
        self.state.kitties.nonce += 1;
        Ok(())
    }

    fn set_price(&mut self, sender: AccountId, kitty_id: Hash, new_price: Balance) -> Result<()> {
        let mut kitty = self.kitty(&kitty_id, "This cat does not exist")?;
        let owner = self.owner_of(&kitty_id)?;
        ensure(owner == sender, "You do not own this cat")?;

        kitty.price = new_price;
        self.state.kitties.kitties.insert(kitty_id, kitty);
        self.deposit_event(Event::PriceSet(sender, kitty_id, new_price));
        Ok(())
    }

    fn buy_kitty(&mut self, sender: AccountId, kitty_id: Hash, max_price: Balance) -> Result<()> {
        let mut kitty = self.kitty(&kitty_id, "This cat does not exist")?;
        let owner = self.owner_of(&kitty_id)?;
        ensure(owner != sender, "You can't buy your own cat")?;

        let price = kitty.price;
        ensure(price != 0, "The cat you want to buy is not for sale")?;
        ensure(
            price <= max_price,
            "The cat you want to buy costs more than your max price",
        )?;

        self.transfer(&sender, &owner, price)?;
        self.transfer_from(owner, sender, kitty_id)?;

        kitty.price = 0;
        self.state.kitties.kitties.insert(kitty_id, kitty);
        self.deposit_event(Event::Bought(sender, owner, kitty_id, price));
        Ok(())
    }

    fn breed_kitty(&mut self, sender: AccountId, kitty_id_1: Hash, kitty_id_2: Hash) -> Result<()> {
        let kitty_1 = self.kitty(&kitty_id_1, "This cat 1 does not exist")?;
        let kitty_2 = self.kitty(&kitty_id_2, "This cat 2 does not exist")?;

        let id = self.random_hash(&sender)?;
        let mut dna = kitty_1.dna;
        for (i, (gene, r)) in kitty_2.dna.0.iter().zip(id.0.iter()).enumerate() {
            if r % 2 == 0 {
                dna.0[i] = *gene;
            }
        }

        let kitty = Kitty {
            id,
            dna,
            price: 0,
            gen: kitty_1.gen.max(kitty_2.gen) + 1,
        };
        self.mint(sender, id, kitty)?;
        self.state.kitties.nonce += 1;
        Ok(())
    }

    fn create_auction(
        &mut self,
        sender: AccountId,
        kitty_id: Hash,
        min_bid: Balance,
        expiry: BlockNumber,
    ) -> Result<()> {
        self.kitty(&kitty_id, "This cat does not exist")?;
        let owner = self.owner_of(&kitty_id)?;
        ensure(
            owner == sender,
            "You can't set an auction for a cat you don't own",
        )?;
        ensure(
            self.state.kitties.auction(&kitty_id).is_none(),
            "This cat is already up for auction",
        )?;

        let now = self.env.number;
        ensure(
            expiry > now,
            "The expiry has to be greater than the current block number",
        )?;
        ensure(
            expiry <= now + self.env.auction_period_limit,
            "The expiry has to be lower than the limit block number",
        )?;

        let auction = Auction {
            kitty_id,
            kitty_owner: owner,
            expiry,
            min_bid,
            high_bid: min_bid,
            high_bidder: sender,
        };
        self.state.kitties.auctions.insert(kitty_id, auction);
        self.state
            .kitties
            .expiring
            .entry(expiry)
            .or_default()
            .push(kitty_id);

        self.deposit_event(Event::AuctionCreated(kitty_id, min_bid, expiry));
        Ok(())
    }

    fn bid_auction(&mut self, sender: AccountId, kitty_id: Hash, bid: Balance) -> Result<()> {
        let mut auction = self
            .state
            .kitties
            .auction(&kitty_id)
            .cloned()
            .ok_or(KittyError::Dispatch("This cat is not up for auction"))?;
        ensure(
            auction.kitty_owner != sender,
            "You can't bid on your own cat",
        )?;
        ensure(self.env.number <= auction.expiry, "This auction has ended")?;
        ensure(
            bid > auction.high_bid,
            "Your bid must be higher than the current highest bid",
        )?;

        if auction.high_bidder != auction.kitty_owner {
            let previous = auction.high_bidder;
            self.unreserve(&previous, auction.high_bid);
        }
        self.reserve(&sender, bid)?;

        auction.high_bid = bid;
        auction.high_bidder = sender;
        self.state.kitties.auctions.insert(kitty_id, auction);

        self.deposit_event(Event::Bid(kitty_id, sender, bid));
        Ok(())
    }

    /// Resolve the auctions expiring in the current block.
    pub(super) fn settle_auctions(&mut self) {
        let now = self.env.number;
        let due = self
            .state
            .kitties
            .expiring
            .remove(&now)
            .unwrap_or_default();

        for kitty_id in due {
            let Some(auction) = self.state.kitties.auctions.remove(&kitty_id) else {
                continue;
            };
            if auction.high_bidder == auction.kitty_owner {
                self.deposit_event(Event::AuctionExpired(kitty_id));
                continue;
            }

            let (owner, bidder, bid) = (auction.kitty_owner, auction.high_bidder, auction.high_bid);
            match self.transfer_from(owner, bidder, kitty_id) {
                Ok(()) => {
                    self.repatriate_reserved(&bidder, &owner, bid);
                    if let Some(kitty) = self.state.kitties.kitties.get_mut(&kitty_id) {
                        kitty.price = 0;
                    }
                    self.deposit_event(Event::AuctionSettled(kitty_id, bidder, bid));
                }
                Err(e) => {
                    warn!("Auction for {} could not settle: {}", kitty_id.short(), e);
                    self.unreserve(&bidder, bid);
                    self.deposit_event(Event::AuctionExpired(kitty_id));
                }
            }
        }
    }

    fn mint(&mut self, to: AccountId, kitty_id: Hash, kitty: Kitty) -> Result<()> {
        let kitties = &mut self.state.kitties;
        ensure(!kitties.owners.contains_key(&kitty_id), "Kitty already exists")?;

        kitties.all_index.insert(kitty_id, kitties.all.len() as u64);
        kitties.all.push(kitty_id);

        let owned = kitties.owned.entry(to).or_default();
        kitties.owned_index.insert(kitty_id, owned.len() as u64);
        owned.push(kitty_id);

        kitties.kitties.insert(kitty_id, kitty);
        kitties.owners.insert(kitty_id, to);

        self.deposit_event(Event::Created(to, kitty_id));
        Ok(())
    }

    fn transfer_from(&mut self, from: AccountId, to: AccountId, kitty_id: Hash) -> Result<()> {
        let owner = self.owner_of(&kitty_id)?;
        ensure(owner == from, "'from' account does not own this kitty")?;

        let kitties = &mut self.state.kitties;
        let index = kitties
            .owned_index
            .get(&kitty_id)
            .copied()
            .ok_or(KittyError::Dispatch("Kitty is missing from its owner's list"))?
            as usize;
        let from_list = kitties
            .owned
            .get_mut(&from)
            .ok_or(KittyError::Dispatch("Transfer causes underflow of 'from' kitty balance"))?;
        ensure(index < from_list.len(), "Kitty is missing from its owner's list")?;

        from_list.swap_remove(index);
        if let Some(moved) = from_list.get(index).copied() {
            kitties.owned_index.insert(moved, index as u64);
        }
        if from_list.is_empty() {
            kitties.owned.remove(&from);
        }

        let to_list = kitties.owned.entry(to).or_default();
        kitties.owned_index.insert(kitty_id, to_list.len() as u64);
        to_list.push(kitty_id);
        kitties.owners.insert(kitty_id, to);

        self.deposit_event(Event::Transferred(from, to, kitty_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::runtime::{apply_call, build_genesis, on_finalize, BlockEnv, Origin};
    use super::*;
    use crate::chain::calls;
    use crate::chain::state::RuntimeState;
    use crate::config::UpgradeModule;

    fn acct(n: u8) -> AccountId {
        AccountId([n; 32])
    }

    fn env(number: BlockNumber) -> BlockEnv {
        BlockEnv::new(number, &Hash::of(&number.to_le_bytes()), 5, 100)
    }

    fn state() -> RuntimeState {
        build_genesis(&[acct(1), acct(2), acct(3)], 1_000, UpgradeModule::Sudo)
    }

    fn call(state: &mut RuntimeState, n: BlockNumber, who: u8, call: crate::chain::Call) -> Result<()> {
        apply_call(state, &env(n), Origin::Signed(acct(who)), call).0
    }

    fn create(state: &mut RuntimeState, who: u8) -> Hash {
        call(state, 1, who, calls::kitties::create_kitty()).unwrap();
        *state.kitties.all.last().unwrap()
    }

    #[test]
    fn test_create_kitty_tracks_indices() {
        let mut state = state();
        let a = create(&mut state, 1);
        let b = create(&mut state, 1);

        assert_ne!(a, b);
        assert_eq!(state.kitties.all_kitties_count(), 2);
        assert_eq!(state.kitties.owned_kitty_count(&acct(1)), 2);
        assert_eq!(state.kitties.all_index[&b], 1);
        assert_eq!(state.kitties.kitty(&a).unwrap().dna, a);
        assert_eq!(state.kitties.nonce, 2);
    }

    #[test]
    fn test_transfer_swap_removes() {
        let mut state = state();
        let a = create(&mut state, 1);
        let b = create(&mut state, 1);
        let c = create(&mut state, 1);

        assert_eq!(
            call(&mut state, 1, 2, calls::kitties::transfer(acct(2), a)),
            Err(KittyError::Dispatch("You do not own this kitty"))
        );
        call(&mut state, 1, 1, calls::kitties::transfer(acct(2), a)).unwrap();

        assert_eq!(state.kitties.kitties_of(&acct(1)), vec![c, b]);
        assert_eq!(state.kitties.owned_index[&c], 0);
        assert_eq!(state.kitties.kitties_of(&acct(2)), vec![a]);
        assert_eq!(state.kitties.owner_of(&a), Some(acct(2)));
    }

    #[test]
    fn test_set_price_and_buy() {
        let mut state = state();
        let kitty = create(&mut state, 1);

        assert_eq!(
            call(&mut state, 1, 2, calls::kitties::buy_kitty(kitty, 100)),
            Err(KittyError::Dispatch("The cat you want to buy is not for sale"))
        );
        assert_eq!(
            call(&mut state, 1, 2, calls::kitties::set_price(kitty, 50)),
            Err(KittyError::Dispatch("You do not own this cat"))
        );
        call(&mut state, 1, 1, calls::kitties::set_price(kitty, 50)).unwrap();

        assert_eq!(
            call(&mut state, 1, 2, calls::kitties::buy_kitty(kitty, 49)),
            Err(KittyError::Dispatch(
                "The cat you want to buy costs more than your max price"
            ))
        );
        assert_eq!(
            call(&mut state, 1, 1, calls::kitties::buy_kitty(kitty, 50)),
            Err(KittyError::Dispatch("You can't buy your own cat"))
        );

        call(&mut state, 1, 2, calls::kitties::buy_kitty(kitty, 60)).unwrap();
        assert_eq!(state.kitties.owner_of(&kitty), Some(acct(2)));
        assert_eq!(state.kitties.kitty(&kitty).unwrap().price, 0);
        assert_eq!(state.free_balance(&acct(1)), 1_050);
        assert_eq!(state.free_balance(&acct(2)), 950);
    }

    #[test]
    fn test_breed_mixes_dna_and_bumps_generation() {
        let mut state = state();
        let a = create(&mut state, 1);
        let b = create(&mut state, 2);

        call(&mut state, 1, 3, calls::kitties::breed_kitty(a, b)).unwrap();
        let child_id = *state.kitties.all.last().unwrap();
        let child = state.kitties.kitty(&child_id).unwrap();

        assert_eq!(child.gen, 1);
        assert_eq!(state.kitties.owner_of(&child_id), Some(acct(3)));
        for (i, gene) in child.dna.0.iter().enumerate() {
            assert!(*gene == a.0[i] || *gene == b.0[i]);
        }

        assert_eq!(
            call(&mut state, 1, 3, calls::kitties::breed_kitty(Hash::default(), b)),
            Err(KittyError::Dispatch("This cat 1 does not exist"))
        );
    }

    #[test]
    fn test_auction_expiry_bounds() {
        let mut state = state();
        let kitty = create(&mut state, 1);

        assert_eq!(
            call(&mut state, 10, 1, calls::kitties::create_auction(kitty, 5, 10)),
            Err(KittyError::Dispatch(
                "The expiry has to be greater than the current block number"
            ))
        );
        assert_eq!(
            call(&mut state, 10, 1, calls::kitties::create_auction(kitty, 5, 111)),
            Err(KittyError::Dispatch(
                "The expiry has to be lower than the limit block number"
            ))
        );
        assert_eq!(
            call(&mut state, 10, 2, calls::kitties::create_auction(kitty, 5, 20)),
            Err(KittyError::Dispatch(
                "You can't set an auction for a cat you don't own"
            ))
        );
        call(&mut state, 10, 1, calls::kitties::create_auction(kitty, 5, 110)).unwrap();

        let auction = state.kitties.auction(&kitty).unwrap();
        assert_eq!(auction.high_bidder, acct(1));
        assert_eq!(auction.high_bid, 5);
    }

    #[test]
    fn test_bidding_reserves_and_refunds() {
        let mut state = state();
        let kitty = create(&mut state, 1);
        call(&mut state, 1, 1, calls::kitties::predefined_create_auction(kitty, 10)).unwrap();
        assert_eq!(state.kitties.auction(&kitty).unwrap().expiry, 6);

        assert_eq!(
            call(&mut state, 2, 1, calls::kitties::bid_auction(kitty, 20)),
            Err(KittyError::Dispatch("You can't bid on your own cat"))
        );
        assert_eq!(
            call(&mut state, 2, 2, calls::kitties::bid_auction(kitty, 10)),
            Err(KittyError::Dispatch(
                "Your bid must be higher than the current highest bid"
            ))
        );

        call(&mut state, 2, 2, calls::kitties::bid_auction(kitty, 20)).unwrap();
        assert_eq!(state.reserved_balance(&acct(2)), 20);

        call(&mut state, 3, 3, calls::kitties::bid_auction(kitty, 30)).unwrap();
        assert_eq!(state.reserved_balance(&acct(2)), 0);
        assert_eq!(state.free_balance(&acct(2)), 1_000);
        assert_eq!(state.reserved_balance(&acct(3)), 30);

        let events = on_finalize(&mut state, &env(6));
        assert_eq!(events, vec![
            Event::Transferred(acct(1), acct(3), kitty),
            Event::AuctionSettled(kitty, acct(3), 30),
        ]);
        assert_eq!(state.kitties.owner_of(&kitty), Some(acct(3)));
        assert_eq!(state.free_balance(&acct(1)), 1_030);
        assert_eq!(state.reserved_balance(&acct(3)), 0);
        assert!(state.kitties.auction(&kitty).is_none());
    }

    #[test]
    fn test_auction_without_bids_expires() {
        let mut state = state();
        let kitty = create(&mut state, 1);
        call(&mut state, 1, 1, calls::kitties::predefined_create_auction(kitty, 10)).unwrap();

        assert!(on_finalize(&mut state, &env(5)).is_empty());
        assert_eq!(on_finalize(&mut state, &env(6)), vec![Event::AuctionExpired(kitty)]);
        assert_eq!(state.kitties.owner_of(&kitty), Some(acct(1)));
    }
}
