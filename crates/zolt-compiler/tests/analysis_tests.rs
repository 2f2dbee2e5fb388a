//! Tests for scope building, indicator accumulation and the completeness checks

mod common;

use common::{assign_contract, compile, compile_pedantic, counter_contract, id_of, Ast};
use zolt_compiler::indicator::ReasonKind;
use zolt_compiler::{CompilerError, OccurrenceRole, ScopeKind, Strategy, WriteShape};

// ============================================================================
// SCOPES AND BINDINGS
// ============================================================================

#[test]
fn test_scope_tree_shape() {
    let ast = Ast::new();
    let tree = compile(assign_contract(&ast)).unwrap();

    let contract = tree.contract_scope("Assign").unwrap();
    let scope = tree.scopes.get(contract);
    assert_eq!(scope.kind, ScopeKind::Contract);
    assert_eq!(scope.children.len(), 2);

    let constructor = tree.function_scope("constructor").unwrap();
    assert!(tree.scopes.get(constructor).is_constructor());
    assert_eq!(tree.scopes.get(constructor).parent, Some(contract));
    assert_eq!(tree.scopes.get(constructor).parameters[0].name, "init");
}

#[test]
fn test_overloads_get_unique_names() {
    let ast = Ast::new();
    let a = ast.state("a", ast.uint(), false);
    let p = ast.param("p", false);
    let first = ast.function("set", vec![p], vec![ast.set("a", "=", "p")]);
    let q = ast.param("q", false);
    let r = ast.param("r", false);
    let second = ast.function("set", vec![q, r], vec![ast.set("a", "=", "q")]);
    let tree = compile(ast.contract("C", vec![a, first, second])).unwrap();

    assert!(tree.function_scope("set").is_some());
    let overload = tree.function_scope("set_1").unwrap();
    assert_eq!(tree.scopes.get(overload).parameters.len(), 2);
}

#[test]
fn test_identifiers_resolve_to_declarations() {
    let ast = Ast::new();
    let a = ast.state("a", ast.uint(), true);
    let init = ast.param("init", true);
    let target = ast.ident("a");
    let value = ast.ident("init");
    let statement = ast.stmt(ast.assign("=", target.clone(), value.clone()));
    let constructor = ast.constructor(vec![init.clone()], vec![statement]);
    let v = ast.param("v", true);
    let assign = ast.function("assign", vec![v], vec![ast.set("a", "=", "v")]);
    let tree = compile(ast.contract("C", vec![a.clone(), constructor, assign])).unwrap();

    assert_eq!(tree.scopes.resolution(id_of(&target)), Some(id_of(&a)));
    assert_eq!(tree.scopes.resolution(id_of(&value)), Some(id_of(&init)));
    assert!(tree.scopes.binding(id_of(&a)).unwrap().is_secret_state());
}

#[test]
fn test_special_identifiers_do_not_resolve() {
    let ast = Ast::new();
    let owner = ast.state("owner", ast.address(), false);
    let lhs = ast.ident("owner");
    let sender = ast.msg_sender();
    let body = vec![ast.stmt(ast.assign("=", lhs, sender))];
    let claim = ast.function("claim", vec![], body);
    assert!(compile(ast.contract("C", vec![owner, claim])).is_ok());
}

#[test]
fn test_unresolved_reference() {
    let ast = Ast::new();
    let a = ast.state("a", ast.uint(), false);
    let ghost = ast.ident("ghost");
    let lhs = ast.ident("a");
    let body = vec![ast.stmt(ast.assign("=", lhs, ghost.clone()))];
    let f = ast.function("f", vec![], body);

    match compile(ast.contract("C", vec![a, f])) {
        Err(CompilerError::UnresolvedReference { name, src }) => {
            assert_eq!(name, "ghost");
            assert_eq!(src.to_string(), ghost["src"].as_str().unwrap());
        }
        other => panic!("expected an unresolved reference, got {other:?}"),
    }
}

#[test]
fn test_unsupported_mapping_key() {
    let ast = Ast::new();
    let balances = ast.state("balances", ast.mapping(ast.uint(), ast.uint()), true);
    let i = ast.param("i", true);
    let j = ast.param("j", true);
    let base = ast.ident("balances");
    let left = ast.ident("i");
    let right = ast.ident("j");
    let key = ast.binary("+", left, right);
    let target = ast.index(base, key);
    let value = ast.number(1);
    let body = vec![ast.stmt(ast.assign("=", target, value))];
    let f = ast.function("f", vec![i, j], body);

    assert!(matches!(
        compile(ast.contract("C", vec![balances, f])),
        Err(CompilerError::UnsupportedConstruct { .. })
    ));
}

// ============================================================================
// SCENARIO TESTS
// ============================================================================

#[test]
fn test_whole_state_written_twice() {
    let ast = Ast::new();
    let tree = compile(assign_contract(&ast)).unwrap();

    let contract = tree.contract_scope("Assign").unwrap();
    let flags = tree.scopes.get(contract).contract_flags().unwrap();
    assert!(flags.new_commitments_required);
    assert!(flags.nullifiers_required);
    assert!(!flags.old_commitment_access_required);
    assert!(flags.zk_snark_verification_required);

    let assign = tree.function_scope("assign").unwrap();
    let indicator = tree.scopes.get(assign).function_indicator().unwrap();
    assert!(indicator.flags.new_commitments_required);
    assert!(indicator.flags.nullifiers_required);
    assert!(!indicator.flags.old_commitment_access_required);
    assert_eq!(indicator.state_named("a").unwrap().strategy, Some(Strategy::Whole));

    let constructor = tree.function_scope("constructor").unwrap();
    let initial = tree.scopes.get(constructor).function_indicator().unwrap();
    assert!(initial.flags.new_commitments_required);
    assert!(!initial.flags.nullifiers_required);
    assert!(tree.warnings.is_empty());
}

#[test]
fn test_incremented_state_is_partitioned() {
    let ast = Ast::new();
    let tree = compile(counter_contract(&ast)).unwrap();

    let add = tree.function_scope("add").unwrap();
    let state = tree.scopes.get(add).function_indicator().unwrap().state_named("x").unwrap().clone();
    assert_eq!(state.strategy, Some(Strategy::Partitioned));
    assert!(state.flags.is_incremented);
    assert!(!state.flags.is_decremented);
    assert!(!state.flags.nullifiers_required);
    assert!(!state.flags.is_accessed);

    let binding = tree.scopes.binding(state.binding).unwrap();
    assert!(binding.strategy.is_partitioned());
    assert!(!binding.strategy.is_whole());
    let roles: Vec<OccurrenceRole> = binding.occurrences.referencing().iter().map(|o| o.role).collect();
    assert_eq!(roles, vec![OccurrenceRole::Write(WriteShape::Increment), OccurrenceRole::SelfOperand]);
}

#[test]
fn test_overwrite_after_increment_conflicts() {
    let ast = Ast::new();
    let x = ast.state("x", ast.uint(), true);
    let k = ast.param("k", true);
    let add = ast.function("add", vec![k], vec![ast.set("x", "+=", "k")]);
    let v = ast.param("v", true);
    let reset = ast.function("reset", vec![v], vec![ast.set("x", "=", "v")]);

    match compile(ast.contract("C", vec![x.clone(), add, reset])) {
        Err(CompilerError::CommitmentStrategyConflict { name, src, first, second }) => {
            assert_eq!(name, "x");
            assert_eq!(src.to_string(), x["src"].as_str().unwrap());
            assert_eq!(first.kind, ReasonKind::Incremented);
            assert_eq!(second.kind, ReasonKind::Overwritten);
        }
        other => panic!("expected a strategy conflict, got {other:?}"),
    }
}

#[test]
fn test_msg_sender_prepended_to_custom_inputs() {
    let ast = Ast::new();
    let records = ast.state("records", ast.mapping(ast.uint(), ast.uint()), true);
    let owner = ast.state("owner", ast.address(), true);

    let lhs = ast.ident("owner");
    let sender = ast.msg_sender();
    let constructor = ast.constructor(vec![], vec![ast.stmt(ast.assign("=", lhs, sender))]);

    let name = ast.param("name", false);
    let mapping_key = ast.param("mappingKey", false);
    let base = ast.ident("records");
    let key = ast.ident("mappingKey");
    let target = ast.index(base, key);
    let value = ast.ident("name");
    let write_record = ast.stmt(ast.assign("=", target, value));
    let lhs = ast.ident("owner");
    let sender = ast.msg_sender();
    let write_owner = ast.stmt(ast.assign("=", lhs, sender));
    let f = ast.function("f", vec![name, mapping_key], vec![write_record, write_owner]);

    let tree = compile(ast.contract("C", vec![records, owner, constructor, f])).unwrap();
    let f = tree.function_scope("f").unwrap();
    assert!(tree.scopes.get(f).function_indicator().unwrap().flags.msg_sender_param);

    let post = tree.select(f, zolt_compiler::Section::PostStatements).unwrap();
    assert_eq!(post.len(), 1);
    assert_eq!(post[0].get("customInputs").unwrap(), &serde_json::json!(["msgSender", "name", "mappingKey"]));
    assert_eq!(post[0].get("functionName").unwrap(), "f");

    // the public `name` parameter ends up in a secret mapping
    assert_eq!(tree.warnings.len(), 1);
    assert!(tree.warnings[0].message.contains("'name'"));
}

#[test]
fn test_require_privacy_annotation() {
    let ast = Ast::new();
    let x = ast.param("x", true);
    let y = ast.param("y", false);
    let five = ast.number(5);
    let x_ref = ast.ident("x");
    let private_call = ast.call("require", vec![ast.binary(">", x_ref, five)]);
    let five = ast.number(5);
    let y_ref = ast.ident("y");
    let public_call = ast.call("require", vec![ast.binary(">", y_ref, five)]);
    let body = vec![ast.stmt(private_call.clone()), ast.stmt(public_call.clone())];
    let check = ast.function("check", vec![x, y], body);

    let tree = compile(ast.contract("C", vec![check])).unwrap();
    assert_eq!(tree.annotations.require_statement_private(id_of(&private_call)), Some(true));
    assert_ne!(tree.annotations.require_statement_private(id_of(&public_call)), Some(true));
}

// ============================================================================
// INDICATOR DETAILS
// ============================================================================

#[test]
fn test_read_after_write_requires_old_commitment() {
    let ast = Ast::new();
    let a = ast.state("a", ast.uint(), true);
    let init = ast.param("init", true);
    let constructor = ast.constructor(vec![init], vec![ast.set("a", "=", "init")]);
    let v = ast.param("v", true);
    let bump = ast.function("bump", vec![v], vec![ast.set("a", "=", "v")]);
    let t = ast.param("t", false);
    let a_ref = ast.ident("a");
    let t_ref = ast.ident("t");
    let guard = ast.call("require", vec![ast.binary(">", a_ref, t_ref)]);
    let check = ast.function("check", vec![t], vec![ast.stmt(guard)]);

    let tree = compile(ast.contract("C", vec![a, constructor, bump, check])).unwrap();
    let check = tree.function_scope("check").unwrap();
    let indicator = tree.scopes.get(check).function_indicator().unwrap();
    assert!(indicator.flags.old_commitment_access_required);
    assert!(indicator.flags.contains_accessed_only_state);
    assert!(!indicator.flags.new_commitments_required);

    let contract = tree.contract_scope("C").unwrap();
    let flags = tree.scopes.get(contract).contract_flags().unwrap();
    assert!(flags.contains_accessed_only_state);
    assert!(flags.old_commitment_access_required);
}

#[test]
fn test_initialisation_follows_constructor_not_source_order() {
    let ast = Ast::new();
    let a = ast.state("a", ast.uint(), true);
    let v = ast.param("v", true);
    let assign = ast.function("assign", vec![v], vec![ast.set("a", "=", "v")]);
    let init = ast.param("init", true);
    let constructor = ast.constructor(vec![init], vec![ast.set("a", "=", "init")]);

    let tree = compile(ast.contract("Assign", vec![a.clone(), assign, constructor])).unwrap();
    let binding = tree.scopes.binding(id_of(&a)).unwrap();
    let nullifying: Vec<_> = binding.occurrences.nullifying().iter().map(|o| o.scope).collect();
    let assign = tree.function_scope("assign").unwrap();
    assert_eq!(nullifying, vec![assign]);

    assert!(tree.scopes.get(assign).function_indicator().unwrap().flags.nullifiers_required);
    let constructor = tree.function_scope("constructor").unwrap();
    let initial = tree.scopes.get(constructor).function_indicator().unwrap();
    assert!(initial.flags.new_commitments_required);
    assert!(!initial.flags.nullifiers_required);
}

#[test]
fn test_read_before_constructor_in_source_needs_old_commitment() {
    let ast = Ast::new();
    let a = ast.state("a", ast.uint(), true);
    let k = ast.param("k", true);
    let lhs = ast.ident("a");
    let a_ref = ast.ident("a");
    let k_ref = ast.ident("k");
    let product = ast.binary("*", a_ref, k_ref);
    let scale = ast.function("scale", vec![k], vec![ast.stmt(ast.assign("=", lhs, product))]);
    let init = ast.param("init", true);
    let constructor = ast.constructor(vec![init], vec![ast.set("a", "=", "init")]);

    let tree = compile(ast.contract("C", vec![a, scale, constructor])).unwrap();
    let scale = tree.function_scope("scale").unwrap();
    let flags = &tree.scopes.get(scale).function_indicator().unwrap().flags;
    assert!(flags.old_commitment_access_required);
    assert!(flags.nullifiers_required);

    let constructor = tree.function_scope("constructor").unwrap();
    let initial = tree.scopes.get(constructor).function_indicator().unwrap();
    assert!(!initial.flags.old_commitment_access_required);
}

#[test]
fn test_msg_sender_key_under_public_condition() {
    let ast = Ast::new();
    let count = ast.state("count", ast.uint(), false);
    let balances = ast.state("balances", ast.mapping(ast.address(), ast.uint()), true);
    let amount = ast.param("amount", true);
    let count_ref = ast.ident("count");
    let zero = ast.number(0);
    let condition = ast.binary(">", count_ref, zero);
    let base = ast.ident("balances");
    let key = ast.msg_sender();
    let target = ast.index(base, key);
    let value = ast.ident("amount");
    let write = ast.stmt(ast.assign("=", target, value));
    let guarded = ast.if_then(condition, vec![write.clone()]);
    let deposit = ast.function("deposit", vec![amount], vec![guarded.clone()]);

    let tree = compile(ast.contract("C", vec![count, balances, deposit])).unwrap();
    let deposit = tree.function_scope("deposit").unwrap();
    assert!(!tree.scopes.get(deposit).function_indicator().unwrap().flags.msg_sender_param);
    assert!(tree.annotations.interacts_with_secret(id_of(&guarded)));
    assert!(tree.annotations.interacts_with_secret(id_of(&write)));
}

#[test]
fn test_decrement_nullifies_partitioned_state() {
    let ast = Ast::new();
    let balance = ast.state("balance", ast.uint(), true);
    let k = ast.param("k", true);
    let deposit = ast.function("deposit", vec![k], vec![ast.set("balance", "+=", "k")]);
    let k = ast.param("k", true);
    let spend = ast.function("spend", vec![k], vec![ast.set("balance", "-=", "k")]);

    let tree = compile(ast.contract("Wallet", vec![balance, deposit, spend])).unwrap();
    let spend = tree.function_scope("spend").unwrap();
    let state = tree.scopes.get(spend).function_indicator().unwrap().state_named("balance").unwrap();
    assert!(state.flags.is_decremented);
    assert!(state.flags.nullifiers_required);
    assert!(state.flags.old_commitment_access_required);

    let deposit = tree.function_scope("deposit").unwrap();
    let state = tree.scopes.get(deposit).function_indicator().unwrap().state_named("balance").unwrap();
    assert!(state.flags.is_incremented);
    assert!(!state.flags.nullifiers_required);
}

#[test]
fn test_dynamic_mapping_key_writes_all_nullify() {
    let ast = Ast::new();
    let balances = ast.state("balances", ast.mapping(ast.address(), ast.uint()), true);
    let amount = ast.param("amount", true);
    let base = ast.ident("balances");
    let key = ast.msg_sender();
    let target = ast.index(base, key);
    let value = ast.ident("amount");
    let body = vec![ast.stmt(ast.assign("=", target, value))];
    let set = ast.function("set", vec![amount], body);

    let tree = compile(ast.contract("C", vec![balances.clone(), set])).unwrap();
    let binding = tree.scopes.binding(id_of(&balances)).unwrap();
    let key = binding.mapping_keys.get("msg.sender").unwrap();
    assert!(key.is_msg_sender);
    assert!(key.is_dynamic());
    assert!(key.occurrences.is_nullified());
    assert!(binding.is_nullifiable());
}

#[test]
fn test_binding_lists_are_ordered_subsets() {
    let ast = Ast::new();
    let a = ast.state("a", ast.uint(), true);
    let init = ast.param("init", true);
    let constructor = ast.constructor(vec![init], vec![ast.set("a", "=", "init")]);
    let v = ast.param("v", true);
    let w = ast.param("w", true);
    let body = vec![ast.set("a", "=", "v"), ast.set("w", "=", "a"), ast.set("a", "=", "w")];
    let shuffle = ast.function("shuffle", vec![v, w], body);
    let tree = compile(ast.contract("C", vec![a.clone(), constructor, shuffle])).unwrap();

    for scope in tree.scopes.iter() {
        for binding in scope.bindings() {
            assert!(binding.occurrences.is_consistent(), "{} is inconsistent", binding.name);
            let starts: Vec<usize> = binding.occurrences.referencing().iter().map(|o| o.src.start).collect();
            assert!(starts.windows(2).all(|w| w[0] < w[1]));
        }
    }

    let a = tree.scopes.binding(id_of(&a)).unwrap();
    assert_eq!(a.occurrences.referencing().len(), 4);
    assert_eq!(a.occurrences.modifying().len(), 3);
    assert_eq!(a.occurrences.nullifying().len(), 2);
}

#[test]
fn test_reaccumulation_is_idempotent() {
    let ast = Ast::new();
    let mut tree = compile(assign_contract(&ast)).unwrap();
    let before = tree.indicators_json();
    tree.reaccumulate().unwrap();
    tree.reaccumulate().unwrap();
    assert_eq!(tree.indicators_json(), before);
}

#[test]
fn test_no_state_is_both_whole_and_partitioned() {
    let ast = Ast::new();
    let counter = counter_contract(&ast);
    let tree = compile(counter).unwrap();
    for scope in tree.scopes.iter() {
        for binding in scope.bindings() {
            assert!(!(binding.strategy.is_whole() && binding.strategy.is_partitioned()));
        }
    }
}

// ============================================================================
// COMPLETENESS AND USAGE ERRORS
// ============================================================================

#[test]
fn test_single_setter_nullifies_its_write() {
    let ast = Ast::new();
    let a = ast.state("a", ast.uint(), true);
    let v = ast.param("v", true);
    let set = ast.function("set", vec![v], vec![ast.set("a", "=", "v")]);

    let tree = compile(ast.contract("C", vec![a.clone(), set])).unwrap();
    let binding = tree.scopes.binding(id_of(&a)).unwrap();
    assert_eq!(binding.occurrences.nullifying().len(), 1);
    let set = tree.function_scope("set").unwrap();
    assert!(tree.scopes.get(set).function_indicator().unwrap().flags.nullifiers_required);
}

#[test]
fn test_constructor_only_write_is_not_nullifiable() {
    let ast = Ast::new();
    let a = ast.state("a", ast.uint(), true);
    let v = ast.param("v", true);
    let constructor = ast.constructor(vec![v], vec![ast.set("a", "=", "v")]);

    match compile(ast.contract("C", vec![a.clone(), constructor])) {
        Err(CompilerError::NonNullifiableSecretState { name, src }) => {
            assert_eq!(name, "a");
            assert_eq!(src.to_string(), a["src"].as_str().unwrap());
        }
        other => panic!("expected a nullifiability error, got {other:?}"),
    }
}

#[test]
fn test_secret_constant_is_read_without_assignment() {
    let ast = Ast::new();
    let c = ast.constant_state("c", true);
    let a = ast.state("a", ast.uint(), true);
    let f = ast.function("f", vec![], vec![ast.set("a", "=", "c")]);

    let tree = compile(ast.contract("C", vec![c.clone(), a, f])).unwrap();
    let constant = tree.scopes.binding(id_of(&c)).unwrap();
    assert!(constant.is_constant);
    assert!(!constant.occurrences.is_modified());
    assert!(constant.is_nullifiable());
}

#[test]
fn test_read_of_unwritten_secret_state() {
    let ast = Ast::new();
    let a = ast.state("a", ast.uint(), true);
    let a_ref = ast.ident("a");
    let zero = ast.number(0);
    let guard = ast.call("require", vec![ast.binary(">", a_ref, zero)]);
    let check = ast.function("check", vec![], vec![ast.stmt(guard)]);

    assert!(matches!(
        compile(ast.contract("C", vec![a, check])),
        Err(CompilerError::SyntaxUsage { .. })
    ));
}

#[test]
fn test_secret_into_public_state_is_rejected() {
    let ast = Ast::new();
    let total = ast.state("total", ast.uint(), false);
    let v = ast.param("v", true);
    let f = ast.function("f", vec![v], vec![ast.set("total", "=", "v")]);

    match compile(ast.contract("C", vec![total, f])) {
        Err(CompilerError::SyntaxUsage { message, .. }) => assert!(message.contains("public state")),
        other => panic!("expected a usage error, got {other:?}"),
    }
}

#[test]
fn test_pedantic_reports_unused_secret_state() {
    let ast = Ast::new();
    let unused = ast.state("unused", ast.uint(), true);
    let contract = ast.contract("C", vec![unused]);

    assert!(compile(contract.clone()).unwrap().warnings.is_empty());
    let tree = compile_pedantic(contract).unwrap();
    assert_eq!(tree.warnings.len(), 1);
    assert!(tree.warnings[0].message.contains("'unused'"));
}

#[test]
fn test_source_unit_with_two_contracts() {
    let ast = Ast::new();
    let first = assign_contract(&ast);
    let second = counter_contract(&ast);
    let tree = compile(ast.source_unit(vec![first, second])).unwrap();

    assert_eq!(tree.scopes.contracts().len(), 2);
    assert!(tree.scopes.iter().all(|s| s.is_frozen()));
    assert!(tree.contract_scope("Counter").is_some());
}
