//! Lottery engine: wires storage, registry, collaborators and services together
//! and exposes every operation behind the configured deadline.
//!
//! A deadline that fires drops the operation's future. Any store transaction
//! it held is dropped with it, so nothing it staged is committed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::adapters::{InMemorySeedStore, StaticEntitlements, StoreLedger};
use crate::common::{Clock, Entitlements, Ledger, SeedStore, SystemClock, TenantId};
use crate::config::LotteryConfig;
use crate::draw::{CreateDrawRequest, Draw, DrawService, DrawVerification};
use crate::errors::{LotteryError, LotteryResult};
use crate::games::RuleRegistry;
use crate::metrics::LotteryMetrics;
use crate::prize::{NewPrize, NewPrizeRule, Prize, PrizeAward, PrizeCatalog, PrizeRule, RedeemRecord, RedemptionService};
use crate::settlement::{SettlementEngine, SettlementReport};
use crate::storage::OptimizedStorage;
use crate::store::draws::AllowedTemplate;
use crate::ticket::{IssueTicketRequest, PlaceBetRequest, SubmitNumbersRequest, Ticket, TicketDraw, TicketService};

/// Builder for [`LotteryEngine`]; every collaborator has an in-process default
pub struct LotteryEngineBuilder {
    config: LotteryConfig,
    clock: Option<Arc<dyn Clock>>,
    registry: Option<RuleRegistry>,
    seed_store: Option<Arc<dyn SeedStore>>,
    ledger: Option<Arc<dyn Ledger>>,
    entitlements: Option<Arc<dyn Entitlements>>,
}

impl LotteryEngineBuilder {
    pub fn new(config: LotteryConfig) -> Self {
        Self {
            config,
            clock: None,
            registry: None,
            seed_store: None,
            ledger: None,
            entitlements: None,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn seed_store(mut self, seed_store: Arc<dyn SeedStore>) -> Self {
        self.seed_store = Some(seed_store);
        self
    }

    pub fn ledger(mut self, ledger: Arc<dyn Ledger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn entitlements(mut self, entitlements: Arc<dyn Entitlements>) -> Self {
        self.entitlements = Some(entitlements);
        self
    }

    pub fn build(self) -> LotteryResult<LotteryEngine> {
        let config = Arc::new(self.config);
        let storage = Arc::new(OptimizedStorage::new_with_config(&config.storage)?);
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let registry = Arc::new(self.registry.unwrap_or_else(RuleRegistry::standard));
        let metrics = Arc::new(if config.monitoring.enable_metrics {
            LotteryMetrics::new()?
        } else {
            LotteryMetrics::unexported()?
        });

        let mut memory_seed_store = None;
        let seed_store: Arc<dyn SeedStore> = match self.seed_store {
            Some(store) => store,
            None => {
                let store = Arc::new(InMemorySeedStore::new(clock.clone()));
                memory_seed_store = Some(store.clone());
                store
            }
        };

        let mut store_ledger = None;
        let ledger: Arc<dyn Ledger> = match self.ledger {
            Some(ledger) => ledger,
            None => {
                let ledger = Arc::new(StoreLedger::new(storage.clone(), clock.clone()));
                store_ledger = Some(ledger.clone());
                ledger
            }
        };

        let entitlements = self
            .entitlements
            .unwrap_or_else(|| Arc::new(StaticEntitlements::from_config(&config.entitlements)) as Arc<dyn Entitlements>);

        let draws = Arc::new(DrawService::new(
            storage.clone(),
            registry.clone(),
            seed_store,
            clock.clone(),
            metrics.clone(),
            config.clone(),
        ));
        let tickets = TicketService::new(
            storage.clone(),
            registry.clone(),
            draws.clone(),
            ledger,
            entitlements,
            clock.clone(),
            metrics.clone(),
        );
        let catalog = PrizeCatalog::new(storage.clone(), registry.clone(), clock.clone());
        let settlement = SettlementEngine::new(storage.clone(), registry.clone(), clock.clone(), metrics.clone());
        let redemption = RedemptionService::new(storage.clone(), clock.clone(), metrics.clone());

        info!(
            data_directory = %config.storage.data_directory,
            games = registry.games().count(),
            timeout_ms = config.operations.timeout_ms,
            metrics = config.monitoring.enable_metrics,
            "Lottery engine ready"
        );

        Ok(LotteryEngine {
            timeout: Duration::from_millis(config.operations.timeout_ms),
            config,
            registry,
            clock,
            metrics,
            draws,
            tickets,
            catalog,
            settlement,
            redemption,
            memory_seed_store,
            store_ledger,
        })
    }
}

pub struct LotteryEngine {
    config: Arc<LotteryConfig>,
    registry: Arc<RuleRegistry>,
    clock: Arc<dyn Clock>,
    metrics: Arc<LotteryMetrics>,
    draws: Arc<DrawService>,
    tickets: TicketService,
    catalog: PrizeCatalog,
    settlement: SettlementEngine,
    redemption: RedemptionService,
    memory_seed_store: Option<Arc<InMemorySeedStore>>,
    store_ledger: Option<Arc<StoreLedger>>,
    timeout: Duration,
}

impl LotteryEngine {
    pub fn builder(config: LotteryConfig) -> LotteryEngineBuilder {
        LotteryEngineBuilder::new(config)
    }

    pub fn config(&self) -> &LotteryConfig {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn metrics(&self) -> &LotteryMetrics {
        &self.metrics
    }

    /// Present when the engine was built without an external seed store
    pub fn memory_seed_store(&self) -> Option<&Arc<InMemorySeedStore>> {
        self.memory_seed_store.as_ref()
    }

    /// Present when the engine was built without an external ledger
    pub fn store_ledger(&self) -> Option<&Arc<StoreLedger>> {
        self.store_ledger.as_ref()
    }

    async fn bounded<T, F>(&self, operation: &'static str, future: F) -> LotteryResult<T>
    where
        F: Future<Output = LotteryResult<T>>,
    {
        let result = match tokio::time::timeout(self.timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "Operation deadline exceeded");
                Err(LotteryError::Timeout {
                    operation: operation.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        };
        if let Err(err) = &result {
            self.metrics.record_error(err.code());
        }
        result
    }

    // Draws

    pub async fn create_draw(&self, request: CreateDrawRequest) -> LotteryResult<Draw> {
        self.bounded("create_draw", self.draws.create_draw(request)).await
    }

    pub async fn get_draw(&self, draw_id: Uuid) -> LotteryResult<Draw> {
        self.bounded("get_draw", self.draws.get_draw(draw_id)).await
    }

    pub fn list_draws(&self, tenant_id: TenantId, game_code: &str) -> LotteryResult<Vec<Draw>> {
        self.draws.list_draws(tenant_id, game_code)
    }

    pub async fn current_draw(&self, tenant_id: TenantId, game_code: &str) -> LotteryResult<Draw> {
        self.bounded("current_draw", self.draws.current_draw(tenant_id, game_code))
            .await
    }

    pub async fn open_sales(&self, draw_id: Uuid) -> LotteryResult<Draw> {
        self.bounded("open_sales", self.draws.open_sales(draw_id)).await
    }

    pub async fn execute_draw(&self, draw_id: Uuid) -> LotteryResult<Draw> {
        self.bounded("execute_draw", self.draws.execute_draw(draw_id)).await
    }

    pub async fn manual_close(&self, draw_id: Uuid, reason: &str) -> LotteryResult<Draw> {
        self.bounded("manual_close", self.draws.manual_close(draw_id, reason))
            .await
    }

    pub async fn reopen_draw(&self, draw_id: Uuid) -> LotteryResult<Draw> {
        self.bounded("reopen_draw", self.draws.reopen(draw_id)).await
    }

    pub async fn cancel_draw(&self, draw_id: Uuid, reason: &str) -> LotteryResult<Draw> {
        self.bounded("cancel_draw", self.draws.cancel_draw(draw_id, reason))
            .await
    }

    pub async fn allow_ticket_template(&self, draw_id: Uuid, template_id: Uuid) -> LotteryResult<AllowedTemplate> {
        self.bounded(
            "allow_ticket_template",
            self.draws.allow_ticket_template(draw_id, template_id),
        )
        .await
    }

    pub async fn revoke_ticket_template(&self, draw_id: Uuid, template_id: Uuid) -> LotteryResult<()> {
        self.bounded(
            "revoke_ticket_template",
            self.draws.revoke_ticket_template(draw_id, template_id),
        )
        .await
    }

    pub fn verify_draw(&self, draw_id: Uuid) -> LotteryResult<DrawVerification> {
        self.draws.verify_draw(draw_id)
    }

    // Tickets

    pub async fn issue_ticket(&self, request: IssueTicketRequest) -> LotteryResult<Ticket> {
        self.bounded("issue_ticket", self.tickets.issue_ticket(request)).await
    }

    pub async fn submit_numbers(&self, request: SubmitNumbersRequest) -> LotteryResult<Ticket> {
        self.bounded("submit_numbers", self.tickets.submit_numbers(request))
            .await
    }

    pub async fn place_bet(&self, request: PlaceBetRequest) -> LotteryResult<Ticket> {
        self.bounded("place_bet", self.tickets.place_bet(request)).await
    }

    pub async fn cancel_ticket(&self, ticket_id: Uuid, reason: &str) -> LotteryResult<Ticket> {
        self.bounded("cancel_ticket", self.tickets.cancel_ticket(ticket_id, reason))
            .await
    }

    pub fn get_ticket(&self, ticket_id: Uuid) -> LotteryResult<Ticket> {
        self.tickets.get_ticket(ticket_id)
    }

    pub fn tickets_for_draw(&self, draw_id: Uuid) -> LotteryResult<Vec<Ticket>> {
        self.tickets.tickets_for_draw(draw_id)
    }

    pub fn participations(&self, ticket_id: Uuid) -> LotteryResult<Vec<TicketDraw>> {
        self.tickets.participations(ticket_id)
    }

    // Prizes

    pub async fn create_prize(&self, request: NewPrize) -> LotteryResult<Prize> {
        self.bounded("create_prize", self.catalog.create_prize(request)).await
    }

    pub async fn update_prize_cost(&self, prize_id: Uuid, cost: i64) -> LotteryResult<Prize> {
        self.bounded("update_prize_cost", self.catalog.update_prize_cost(prize_id, cost))
            .await
    }

    pub async fn set_prize_active(&self, prize_id: Uuid, active: bool) -> LotteryResult<Prize> {
        self.bounded("set_prize_active", self.catalog.set_prize_active(prize_id, active))
            .await
    }

    pub async fn create_prize_rule(&self, request: NewPrizeRule) -> LotteryResult<PrizeRule> {
        self.bounded("create_prize_rule", self.catalog.create_rule(request))
            .await
    }

    pub async fn deactivate_prize_rule(&self, rule_id: Uuid) -> LotteryResult<PrizeRule> {
        self.bounded("deactivate_prize_rule", self.catalog.deactivate_rule(rule_id))
            .await
    }

    pub fn get_prize(&self, prize_id: Uuid) -> LotteryResult<Prize> {
        self.catalog.get_prize(prize_id)
    }

    // Settlement and redemption

    pub async fn settle_draw(&self, draw_id: Uuid) -> LotteryResult<SettlementReport> {
        self.bounded("settle_draw", self.settlement.settle_draw(draw_id)).await
    }

    pub async fn redeem(&self, award_id: Uuid, redeemed_by: Option<String>) -> LotteryResult<RedeemRecord> {
        self.bounded("redeem", self.redemption.redeem(award_id, redeemed_by))
            .await
    }

    pub fn get_award(&self, award_id: Uuid) -> LotteryResult<PrizeAward> {
        self.redemption.get_award(award_id)
    }

    pub fn awards_for_draw(&self, draw_id: Uuid) -> LotteryResult<Vec<PrizeAward>> {
        self.redemption.awards_for_draw(draw_id)
    }
}
