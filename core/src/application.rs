use std::collections::{BTreeMap, HashMap};

use concilium_sandbox::{Sandbox, Value};
use tracing::{debug, warn};

use crate::contract::{is_valid_method_name, Contract, CONTRACT_METHOD_SEPARATOR, MIN_CONTRACT_FEE};
use crate::error::CoreError;
use crate::patch::Patch;
use crate::transaction::{Receipt, Transaction};
use crate::utxo::{Utxo, UtxoAccessError};

/// The transaction-processing state machine: orchestrates inputs, outputs,
/// and contract creation/invocation against a [`Patch`]. Single-threaded
/// with respect to one patch. A block is processed transactions-in-order,
/// and within a transaction, inputs and outputs are processed in their
/// declared order.
pub struct Application {
    sandbox: Sandbox,
}

impl Application {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }

    /// Validate and spend every input of `tx` against `utxo_snapshot`
    /// (falling back from `block_patch` when one is supplied), returning
    /// the patch carrying the spend-marks and the summed input value.
    ///
    /// Failures abort the whole transaction: no partial mutation survives
    /// beyond spends already applied to `block_patch` for inputs before the
    /// failing one. It is the caller's contract to discard that patch or
    /// accept the partial result.
    pub fn process_tx_inputs(
        &self,
        tx: &Transaction,
        utxo_snapshot: &HashMap<[u8; 32], Utxo>,
        block_patch: Option<Patch>,
    ) -> Result<(Patch, u64), CoreError> {
        let mut patch = block_patch.unwrap_or_else(|| Patch::new(0));
        let tx_hash = tx.hash();
        let mut total_in: u64 = 0;
        let mut seen_this_tx: std::collections::HashSet<([u8; 32], u32)> =
            std::collections::HashSet::new();

        for (i, input) in tx.inputs.iter().enumerate() {
            let signed_digest = tx.hash_input(i as u32);
            let referenced_hex = hex::encode(input.referenced_tx_hash);
            let seen_key = (input.referenced_tx_hash, input.output_index);

            if !seen_this_tx.insert(seen_key) {
                return Err(CoreError::AlreadyDeleted {
                    tx_hash: referenced_hex,
                    index: input.output_index,
                });
            }

            let utxo = match patch.get_utxo(&input.referenced_tx_hash) {
                Some(u) => u.clone(),
                None => match utxo_snapshot.get(&input.referenced_tx_hash) {
                    Some(u) => u.clone(),
                    None => {
                        return Err(CoreError::UtxoNotFound {
                            tx_hash: referenced_hex,
                        })
                    }
                },
            };

            let coins = utxo.coins_at_index(input.output_index).map_err(|e| match e {
                UtxoAccessError::AlreadySpent | UtxoAccessError::NotFound => {
                    CoreError::AlreadySpentOutput {
                        tx_hash: referenced_hex.clone(),
                        index: input.output_index,
                    }
                }
            })?;

            let recovered_public_key =
                concilium_crypto::recover_public_key(&signed_digest, &input.claim_proof)?;
            let recovered_address = concilium_crypto::address_from_public_key(&recovered_public_key);
            if recovered_address != coins.receiver {
                warn!(
                    tx = %hex::encode(tx_hash),
                    input = i,
                    "claim verification failed"
                );
                return Err(CoreError::ClaimFailed);
            }

            patch.spend_coins(&utxo, input.output_index, tx_hash)?;
            total_in = total_in
                .checked_add(coins.amount)
                .ok_or(CoreError::AmountOverflow)?;
        }

        Ok((patch, total_in))
    }

    /// Mint every declared output of `tx` at `(tx.hash(), index)`, in
    /// declared order. No balance validation happens here; the caller
    /// checks `total_in >= total_out + fee` once both sides are known.
    pub fn process_payments(&self, tx: &Transaction, patch: &mut Patch) -> Result<u64, CoreError> {
        let tx_hash = tx.hash();
        let mut total_out: u64 = 0;
        for (index, output) in tx.outputs.iter().enumerate() {
            patch.create_coins(tx_hash, index as u32, output.coins)?;
            total_out = total_out
                .checked_add(output.coins.amount)
                .ok_or(CoreError::AmountOverflow)?;
        }
        Ok(total_out)
    }

    /// Deploy contract `code` carried by `tx`, under `env` bindings and a
    /// `budget` (coins the caller is willing to spend). Entering the
    /// sandbox always costs at least [`MIN_CONTRACT_FEE`]; a budget below
    /// that floor fails without ever invoking the sandbox. Sandbox and
    /// deploy-time validation failures never propagate as `Err`. They
    /// become a FAILED receipt with `contract` left `None`.
    pub fn create_contract(
        &self,
        tx: &Transaction,
        budget: u64,
        code: &str,
        env: &BTreeMap<String, Value>,
        patch: &mut Patch,
    ) -> (Receipt, Option<Contract>) {
        let tx_hash = tx.hash();
        let address = concilium_crypto::address_from_hash(&tx_hash);

        if budget < MIN_CONTRACT_FEE {
            warn!(tx = %hex::encode(tx_hash), budget, "deployment budget below MIN_CONTRACT_FEE");
            return (Receipt::failed(MIN_CONTRACT_FEE, None), None);
        }

        let outcome = match self.sandbox.deploy(code, env) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(tx = %hex::encode(tx_hash), error = %e, "contract deployment failed in sandbox");
                return (Receipt::failed(MIN_CONTRACT_FEE, None), None);
            }
        };

        for method in &outcome.methods {
            if !is_valid_method_name(&method.name) || method.source.contains(CONTRACT_METHOD_SEPARATOR)
            {
                warn!(
                    tx = %hex::encode(tx_hash),
                    method = %method.name,
                    "contract deployment rejected: bad definition"
                );
                return (Receipt::failed(MIN_CONTRACT_FEE, None), None);
            }
        }

        let code = outcome
            .methods
            .iter()
            .map(|m| m.source.as_str())
            .collect::<Vec<_>>()
            .join(CONTRACT_METHOD_SEPARATOR);
        let contract = Contract::new(address, outcome.data, code, tx.witness_group_id);
        patch.set_contract(contract.clone());

        debug!(tx = %hex::encode(tx_hash), address = %address, "contract deployed");
        (Receipt::ok(MIN_CONTRACT_FEE, Some(address)), Some(contract))
    }

    /// Invoke `invocation` (`"method(args)"`, or empty for `_default`) on
    /// `contract`, under `env` bindings and `budget`. On success, the
    /// contract's `data` is mutated in place and an OK receipt returned. On
    /// any sandbox failure (unknown method, thrown error, timeout, size
    /// cap, or insufficient budget), `contract` is left untouched and a
    /// FAILED receipt is returned.
    pub fn run_contract(
        &self,
        budget: u64,
        invocation: &str,
        contract: &mut Contract,
        env: &BTreeMap<String, Value>,
    ) -> Receipt {
        if budget < MIN_CONTRACT_FEE {
            warn!(address = %contract.address, budget, "invocation budget below MIN_CONTRACT_FEE");
            return Receipt::failed(MIN_CONTRACT_FEE, Some(contract.address));
        }

        match self.sandbox.invoke(
            &contract.code,
            CONTRACT_METHOD_SEPARATOR,
            &contract.data,
            invocation,
            env,
        ) {
            Ok(outcome) => {
                contract.data = outcome.data;
                debug!(address = %contract.address, invocation, "contract invocation succeeded");
                Receipt::ok(MIN_CONTRACT_FEE, Some(contract.address))
            }
            Err(e) => {
                warn!(address = %contract.address, invocation, error = %e, "contract invocation failed");
                Receipt::failed(MIN_CONTRACT_FEE, Some(contract.address))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coins::Coins;
    use crate::storage::{InMemoryStorage, UtxoSnapshotProvider};
    use crate::transaction::{TxInput, TxOutput, TxStatus};
    use concilium_crypto::{address_from_public_key, create_key_pair, sign};
    use concilium_sandbox::SandboxConfig;

    fn app() -> Application {
        Application::new(Sandbox::new(SandboxConfig::for_testing()))
    }

    fn seed_storage(hash: [u8; 32], receiver: concilium_crypto::Address) -> InMemoryStorage {
        let mut storage = InMemoryStorage::new();
        let mut utxo = Utxo::new(hash);
        for index in [0u32, 12, 80] {
            utxo.insert_output(index, Coins::new(100_000, receiver));
        }
        storage.insert(utxo);
        storage
    }

    fn signed_input(hash: [u8; 32], index: u32, tx_for_digest: &Transaction, key: &concilium_crypto::PrivateKey) -> TxInput {
        let digest = tx_for_digest.hash_input(index);
        let claim_proof = sign(&digest, key).unwrap();
        TxInput::new(hash, index, claim_proof)
    }

    #[test]
    fn happy_path_spends_three_inputs_and_mints_one_output() {
        let pair = create_key_pair();
        let a = address_from_public_key(&pair.public_key);
        let h = [7u8; 32];
        let storage = seed_storage(h, a);

        let draft = Transaction::new(
            vec![
                TxInput::new(h, 12, vec![]),
                TxInput::new(h, 0, vec![]),
                TxInput::new(h, 80, vec![]),
            ],
            vec![TxOutput::new(Coins::new(1_000, a))],
            None,
            None,
            0,
        );
        let inputs = vec![
            signed_input(h, 12, &draft, &pair.private_key),
            signed_input(h, 0, &draft, &pair.private_key),
            signed_input(h, 80, &draft, &pair.private_key),
        ];
        let tx = Transaction::new(inputs, draft.outputs.clone(), None, None, 0);

        let snapshot = storage.get_utxos_snapshot(&[h]);
        let application = app();
        let (patch, total_in) = application.process_tx_inputs(&tx, &snapshot, None).unwrap();
        assert_eq!(total_in, 300_000);

        let mut patch = patch;
        let total_out = application.process_payments(&tx, &mut patch).unwrap();
        assert_eq!(total_out, 1_000);

        let tx_hash = tx.hash();
        let minted = patch.get_utxo(&tx_hash).unwrap();
        assert!(!minted.is_empty());

        let spent_h = patch.get_utxo(&h).unwrap();
        for index in [0u32, 12, 80] {
            assert!(spent_h.spent_indices().contains(&index));
        }
    }

    #[test]
    fn unknown_output_index_fails() {
        let pair = create_key_pair();
        let a = address_from_public_key(&pair.public_key);
        let h = [7u8; 32];
        let storage = seed_storage(h, a);

        let draft = Transaction::new(vec![TxInput::new(h, 17, vec![])], vec![], None, None, 0);
        let input = signed_input(h, 17, &draft, &pair.private_key);
        let tx = Transaction::new(vec![input], vec![], None, None, 0);

        let snapshot = storage.get_utxos_snapshot(&[h]);
        let err = app().process_tx_inputs(&tx, &snapshot, None).unwrap_err();
        assert_eq!(err.to_string(), format!("Output #17 of Tx {} already spent!", hex::encode(h)));
    }

    #[test]
    fn bad_claim_fails() {
        let pair = create_key_pair();
        let other = create_key_pair();
        let a = address_from_public_key(&pair.public_key);
        let h = [7u8; 32];
        let storage = seed_storage(h, a);

        let draft = Transaction::new(vec![TxInput::new(h, 12, vec![])], vec![], None, None, 0);
        let input = signed_input(h, 12, &draft, &other.private_key);
        let tx = Transaction::new(vec![input], vec![], None, None, 0);

        let snapshot = storage.get_utxos_snapshot(&[h]);
        let err = app().process_tx_inputs(&tx, &snapshot, None).unwrap_err();
        assert_eq!(err.to_string(), "Claim failed!");
    }

    #[test]
    fn coinbase_mints_without_inputs() {
        let pair = create_key_pair();
        let a = address_from_public_key(&pair.public_key);
        let tx = Transaction::new(vec![], vec![TxOutput::new(Coins::new(100_000, a))], None, None, 0);

        let application = app();
        let mut patch = Patch::new(0);
        let total_out = application.process_payments(&tx, &mut patch).unwrap();
        assert_eq!(total_out, 100_000);
        assert!(!patch.get_utxo(&tx.hash()).unwrap().is_empty());
    }

    #[test]
    fn intra_tx_double_spend_fails_on_second_input() {
        let pair = create_key_pair();
        let a = address_from_public_key(&pair.public_key);
        let h = [7u8; 32];
        let storage = seed_storage(h, a);

        let draft = Transaction::new(
            vec![TxInput::new(h, 12, vec![]), TxInput::new(h, 12, vec![])],
            vec![],
            None,
            None,
            0,
        );
        let inputs = vec![
            signed_input(h, 12, &draft, &pair.private_key),
            signed_input(h, 12, &draft, &pair.private_key),
        ];
        let tx = Transaction::new(inputs, vec![], None, None, 0);

        let snapshot = storage.get_utxos_snapshot(&[h]);
        let err = app().process_tx_inputs(&tx, &snapshot, None).unwrap_err();
        assert_eq!(err.to_string(), format!("Tx {} index 12 already deleted!", hex::encode(h)));
    }

    #[test]
    fn sequential_spend_via_merged_patch_fails() {
        let pair = create_key_pair();
        let a = address_from_public_key(&pair.public_key);
        let h = [7u8; 32];
        let storage = seed_storage(h, a);
        let snapshot = storage.get_utxos_snapshot(&[h]);

        let draft1 = Transaction::new(vec![TxInput::new(h, 12, vec![])], vec![], None, None, 0);
        let input1 = signed_input(h, 12, &draft1, &pair.private_key);
        let tx1 = Transaction::new(vec![input1], vec![], None, None, 0);

        let application = app();
        let (p1, _) = application.process_tx_inputs(&tx1, &snapshot, None).unwrap();

        let draft2 = Transaction::new(vec![TxInput::new(h, 12, vec![])], vec![], None, None, 1);
        let input2 = signed_input(h, 12, &draft2, &pair.private_key);
        let tx2 = Transaction::new(vec![input2], vec![], None, None, 1);

        let p2 = Patch::new(0);
        let p3 = p1.merge(&p2).unwrap();

        let err = application.process_tx_inputs(&tx2, &snapshot, Some(p3)).unwrap_err();
        assert_eq!(err.to_string(), format!("Output #12 of Tx {} already spent!", hex::encode(h)));
    }

    #[test]
    fn deploy_then_run_contract_end_to_end() {
        let application = app();
        let tx = Transaction::new(vec![], vec![], None, None, 0);
        let mut patch = Patch::new(0);
        let mut env = BTreeMap::new();
        env.insert("contractTx".to_string(), Value::String(hex::encode(tx.hash())));
        env.insert(
            "contractAddr".to_string(),
            Value::String(concilium_crypto::address_from_hash(&tx.hash()).to_hex()),
        );

        let source = "class A extends Base { constructor(p) { super(); this._data = p; this._contractAddr = contractAddr; } getData() { return this._data; } }\nexports = new A(10);";
        let (receipt, contract) = application.create_contract(&tx, MIN_CONTRACT_FEE, source, &env, &mut patch);
        assert_eq!(receipt.status, TxStatus::Ok);
        let mut contract = contract.expect("deployment should yield a contract");
        assert_eq!(contract.data["_data"], 10);
        assert_eq!(
            contract.address,
            concilium_crypto::address_from_hash(&tx.hash())
        );

        let run_env = BTreeMap::new();
        let contract_source = "add(a){this.value+=a;}";
        contract.code = contract_source.to_string();
        contract.data = serde_json::json!({"value": 100});

        let receipt = application.run_contract(MIN_CONTRACT_FEE, "add(10)", &mut contract, &run_env);
        assert_eq!(receipt.status, TxStatus::Ok);
        assert_eq!(contract.data["value"], 110);

        let receipt = application.run_contract(MIN_CONTRACT_FEE, "subtract(10)", &mut contract, &run_env);
        assert_eq!(receipt.status, TxStatus::Failed);
        assert_eq!(contract.data["value"], 110);

        contract.code = "_default(){this.value+=17;}".to_string();
        contract.data = serde_json::json!({"value": 100});
        let receipt = application.run_contract(MIN_CONTRACT_FEE, "", &mut contract, &run_env);
        assert_eq!(receipt.status, TxStatus::Ok);
        assert_eq!(contract.data["value"], 117);

        contract.code = "add(a){this.value+=a;}".to_string();
        let receipt = application.run_contract(MIN_CONTRACT_FEE, "", &mut contract, &run_env);
        assert_eq!(receipt.status, TxStatus::Failed);
    }

    #[test]
    fn every_contract_execution_meets_floor_fee() {
        let application = app();
        let mut contract = Contract::new(
            concilium_crypto::Address::from_bytes([1u8; 20]),
            serde_json::json!({"value": 1}),
            "bogus(".to_string(),
            0,
        );
        let receipt = application.run_contract(MIN_CONTRACT_FEE, "bogus()", &mut contract, &BTreeMap::new());
        assert!(receipt.coins_used >= MIN_CONTRACT_FEE);
    }
}
