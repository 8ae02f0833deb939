use std::{sync::Arc, time::Duration};

use time::OffsetDateTime;
use tokio::time::sleep;

use crate::{
    api::{
        SessionClient,
        error::{ApiError, address_not_bound, empty_selection},
        payloads::{AddNewOrder, ReserveTime},
    },
    config::WorkflowConfig,
    schedule::{Mode, Phase, ScheduleError, parse_duration},
    workflow::{
        notify::{AcquisitionOutcome, Notifier},
        retry::{RetryDecision, RetryPolicy},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Prepare,
    Checkout,
    Submit,
}

enum Attempt {
    Ordered { order: AddNewOrder, slot: ReserveTime },
    NoSlot,
}

/// Drives a [`SessionClient`] through identity, address, cart, checkout,
/// slot selection and submission at the cadence dictated by [`Mode`].
pub struct AcquisitionWorkflow {
    client: SessionClient,
    mode: Mode,
    policy: RetryPolicy,
    pay_type: u32,
    select_all: bool,
    wait_for_window: bool,
    notifier: Arc<dyn Notifier>,
}

impl AcquisitionWorkflow {
    pub fn new(
        client: SessionClient,
        mode: Mode,
        config: &WorkflowConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ScheduleError> {
        let backoff_max = parse_duration(&config.retry_backoff_max)?;
        Ok(Self {
            client,
            mode,
            policy: RetryPolicy::new(config.max_attempts, backoff_max, config.retry_codes.clone()),
            pay_type: config.pay_type,
            select_all: config.select_all,
            wait_for_window: config.wait_for_window,
            notifier,
        })
    }

    #[tracing::instrument(name = "acquisition_run", target = "workflow", skip(self))]
    pub async fn run(mut self) -> AcquisitionOutcome {
        let outcome = self.drive().await;
        self.notifier.notify(&outcome).await;
        outcome
    }

    async fn drive(&mut self) -> AcquisitionOutcome {
        if let Err(outcome) = self.prepare().await {
            return outcome;
        }
        if self.wait_for_window {
            self.wait_for_boost().await;
        }

        let mut attempt: u32 = 0;
        loop {
            match self.attempt_once().await {
                Ok(Attempt::Ordered { order, slot }) => {
                    return AcquisitionOutcome::Acquired {
                        order_number: order.order_number,
                        slot_start: slot.start_timestamp,
                        slot_end: slot.end_timestamp,
                        attempts: attempt + 1,
                    };
                }
                Ok(Attempt::NoSlot) => {
                    attempt += 1;
                    if attempt >= self.policy.max_attempts() {
                        return AcquisitionOutcome::WindowMissed {
                            attempts: attempt,
                            reason: "no delivery slot became available".to_string(),
                        };
                    }
                    let delay = self.mode.reserve_interval();
                    tracing::debug!(
                        target: "workflow",
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "no_slot_available"
                    );
                    sleep(delay).await;
                }
                Err((stage, error)) => {
                    let cadence = self.cadence_for(stage);
                    match self.policy.decide(&error, attempt, cadence) {
                        RetryDecision::RetryAfter(delay) => {
                            tracing::warn!(
                                target: "workflow",
                                attempt,
                                stage = ?stage,
                                kind = ?error.kind,
                                code = ?error.code,
                                delay_ms = delay.as_millis() as u64,
                                "attempt_failed_retrying"
                            );
                            attempt += 1;
                            sleep(delay).await;
                        }
                        RetryDecision::Abort => return self.give_up(attempt + 1, error),
                    }
                }
            }
        }
    }

    async fn prepare(&mut self) -> Result<(), AcquisitionOutcome> {
        let mut attempt: u32 = 0;
        loop {
            match self.prepare_once().await {
                Ok(()) => return Ok(()),
                Err(error) => {
                    let cadence = self.cadence_for(Stage::Prepare);
                    match self.policy.decide(&error, attempt, cadence) {
                        RetryDecision::RetryAfter(delay) => {
                            tracing::warn!(
                                target: "workflow",
                                attempt,
                                kind = ?error.kind,
                                delay_ms = delay.as_millis() as u64,
                                "prepare_failed_retrying"
                            );
                            attempt += 1;
                            sleep(delay).await;
                        }
                        RetryDecision::Abort => return Err(self.give_up(attempt + 1, error)),
                    }
                }
            }
        }
    }

    async fn prepare_once(&mut self) -> Result<(), ApiError> {
        if !self.client.session().is_authenticated() {
            self.client.user_detail().await?;
        }

        if self.client.session().address().is_none() {
            let addresses = self.client.user_address().await?;
            let address = addresses.default_address().cloned().ok_or_else(|| {
                let mut err = address_not_bound();
                err.message = "account has no valid delivery address".to_string();
                err
            })?;
            self.client.set_address(address);
        }

        Ok(())
    }

    /// Sleeps up to the boost phase, refreshing the cart while warming up.
    async fn wait_for_boost(&self) {
        loop {
            let now = OffsetDateTime::now_utc();
            let Some(remaining) = self.mode.time_until_boost_at(now) else {
                return;
            };

            if self.mode.phase_at(now) == Phase::WarmUp {
                if let Err(err) = self.client.cart().await {
                    tracing::warn!(target: "workflow", error = %err, "warm_up_cart_refresh_failed");
                }
            }

            let delay = self.mode.cart_interval_at(now).min(remaining);
            tracing::debug!(
                target: "workflow",
                remaining_ms = remaining.as_millis() as u64,
                delay_ms = delay.as_millis() as u64,
                "waiting_for_boost"
            );
            sleep(delay).await;
        }
    }

    async fn attempt_once(&self) -> Result<Attempt, (Stage, ApiError)> {
        let checkout = |err: ApiError| (Stage::Checkout, err);

        let mut cart = self.client.cart().await.map_err(checkout)?;
        if self.select_all {
            let unchecked = cart
                .unchecked_items()
                .map(|item| (item.id.clone(), item.cart_id.clone()))
                .collect::<Vec<_>>();
            for (product_id, cart_id) in unchecked {
                cart = self
                    .client
                    .update_check(&product_id, &cart_id)
                    .await
                    .map_err(checkout)?;
            }
        }

        let product_list = cart
            .new_order_product_list
            .first()
            .ok_or_else(|| checkout(empty_selection("cart has no checked products")))?;

        let use_balance = self.mode.use_balance_at(OffsetDateTime::now_utc());
        let check_order = self
            .client
            .check_order(product_list, use_balance)
            .await
            .map_err(checkout)?;
        let reserve_times = self
            .client
            .multi_reserve_time(&product_list.products)
            .await
            .map_err(checkout)?;

        let Some(slot) = reserve_times.first_available().cloned() else {
            return Ok(Attempt::NoSlot);
        };

        let order = self
            .client
            .add_new_order(self.pay_type, &cart, &slot, &check_order)
            .await
            .map_err(|err| (Stage::Submit, err))?;

        Ok(Attempt::Ordered { order, slot })
    }

    fn cadence_for(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Prepare => self.mode.home_interval(),
            Stage::Checkout => self.mode.recheck_interval(),
            Stage::Submit => self.mode.reorder_interval(),
        }
    }

    fn give_up(&self, attempts: u32, error: ApiError) -> AcquisitionOutcome {
        let retry_eligible = error.retryable
            || error
                .code
                .is_some_and(|code| error.is_business() && self.policy.is_retryable_code(code));

        if retry_eligible && attempts >= self.policy.max_attempts() {
            AcquisitionOutcome::WindowMissed {
                attempts,
                reason: error.to_string(),
            }
        } else {
            AcquisitionOutcome::Fatal { attempts, error }
        }
    }
}
