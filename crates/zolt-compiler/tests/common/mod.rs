//! JSON AST builders shared by the integration tests
//!
//! Ids are handed out in call order and source offsets grow with them, so nodes built
//! earlier sit earlier in the (virtual) source text.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::cell::Cell;
use zolt_compiler::{parse_value, Compiler, CompilerConfig, DecoratedTree, Node, NodeId, Result};

pub struct Ast {
    next: Cell<i64>,
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Ast {
    pub fn new() -> Self {
        Self { next: Cell::new(1) }
    }

    fn site(&self) -> (i64, String) {
        let id = self.next.get();
        self.next.set(id + 1);
        (id, format!("{}:8:0", id * 10))
    }

    pub fn uint(&self) -> Value {
        json!({"nodeType": "ElementaryTypeName", "name": "uint256"})
    }

    pub fn address(&self) -> Value {
        json!({"nodeType": "ElementaryTypeName", "name": "address"})
    }

    pub fn mapping(&self, key: Value, value: Value) -> Value {
        json!({"nodeType": "Mapping", "keyType": key, "valueType": value})
    }

    pub fn state(&self, name: &str, type_name: Value, secret: bool) -> Value {
        let (id, src) = self.site();
        json!({"nodeType": "VariableDeclaration", "id": id, "src": src, "name": name,
               "typeName": type_name, "stateVariable": true, "isSecret": secret, "constant": false})
    }

    pub fn constant_state(&self, name: &str, secret: bool) -> Value {
        let (id, src) = self.site();
        json!({"nodeType": "VariableDeclaration", "id": id, "src": src, "name": name,
               "typeName": self.uint(), "stateVariable": true, "isSecret": secret, "constant": true})
    }

    pub fn param(&self, name: &str, secret: bool) -> Value {
        let (id, src) = self.site();
        json!({"nodeType": "VariableDeclaration", "id": id, "src": src, "name": name,
               "typeName": self.uint(), "stateVariable": false, "isSecret": secret, "constant": false})
    }

    pub fn ident(&self, name: &str) -> Value {
        let (id, src) = self.site();
        json!({"nodeType": "Identifier", "id": id, "src": src, "name": name})
    }

    pub fn number(&self, value: u64) -> Value {
        let (id, src) = self.site();
        json!({"nodeType": "Literal", "id": id, "src": src, "kind": "number", "value": value.to_string()})
    }

    pub fn msg_sender(&self) -> Value {
        let msg = self.ident("msg");
        let (id, src) = self.site();
        json!({"nodeType": "MemberAccess", "id": id, "src": src, "memberName": "sender", "expression": msg})
    }

    pub fn index(&self, base: Value, key: Value) -> Value {
        let (id, src) = self.site();
        json!({"nodeType": "IndexAccess", "id": id, "src": src, "baseExpression": base, "indexExpression": key})
    }

    pub fn binary(&self, op: &str, left: Value, right: Value) -> Value {
        let (id, src) = self.site();
        json!({"nodeType": "BinaryOperation", "id": id, "src": src, "operator": op,
               "leftExpression": left, "rightExpression": right})
    }

    pub fn assign(&self, op: &str, lhs: Value, rhs: Value) -> Value {
        let (id, src) = self.site();
        json!({"nodeType": "Assignment", "id": id, "src": src, "operator": op,
               "leftHandSide": lhs, "rightHandSide": rhs})
    }

    pub fn call(&self, function: &str, arguments: Vec<Value>) -> Value {
        let callee = self.ident(function);
        let (id, src) = self.site();
        json!({"nodeType": "FunctionCall", "id": id, "src": src, "expression": callee, "arguments": arguments})
    }

    pub fn stmt(&self, expression: Value) -> Value {
        let (id, src) = self.site();
        json!({"nodeType": "ExpressionStatement", "id": id, "src": src, "expression": expression})
    }

    pub fn if_then(&self, condition: Value, statements: Vec<Value>) -> Value {
        let (block_id, block_src) = self.site();
        let body = json!({"nodeType": "Block", "id": block_id, "src": block_src, "statements": statements});
        let (id, src) = self.site();
        json!({"nodeType": "IfStatement", "id": id, "src": src, "condition": condition, "trueBody": body})
    }

    /// `lhs op rhs;` as a statement, with both sides given as variable names
    pub fn set(&self, lhs: &str, op: &str, rhs: &str) -> Value {
        let lhs = self.ident(lhs);
        let rhs = self.ident(rhs);
        self.stmt(self.assign(op, lhs, rhs))
    }

    fn function_node(&self, name: &str, kind: &str, params: Vec<Value>, body: Option<Vec<Value>>) -> Value {
        let (list_id, list_src) = self.site();
        let parameters = json!({"nodeType": "ParameterList", "id": list_id, "src": list_src, "parameters": params});
        let body = body.map(|statements| {
            let (id, src) = self.site();
            json!({"nodeType": "Block", "id": id, "src": src, "statements": statements})
        });
        let (id, src) = self.site();
        let mut node = json!({"nodeType": "FunctionDefinition", "id": id, "src": src, "name": name,
                              "kind": kind, "parameters": parameters});
        if let Some(body) = body {
            node["body"] = body;
        }
        node
    }

    pub fn function(&self, name: &str, params: Vec<Value>, statements: Vec<Value>) -> Value {
        self.function_node(name, "function", params, Some(statements))
    }

    pub fn constructor(&self, params: Vec<Value>, statements: Vec<Value>) -> Value {
        self.function_node("", "constructor", params, Some(statements))
    }

    pub fn declaration_only(&self, name: &str, params: Vec<Value>) -> Value {
        self.function_node(name, "function", params, None)
    }

    pub fn contract(&self, name: &str, nodes: Vec<Value>) -> Value {
        let (id, src) = self.site();
        json!({"nodeType": "ContractDefinition", "id": id, "src": src, "name": name, "nodes": nodes})
    }

    pub fn source_unit(&self, nodes: Vec<Value>) -> Value {
        let (id, src) = self.site();
        json!({"nodeType": "SourceUnit", "id": id, "src": src, "nodes": nodes})
    }
}

pub fn id_of(node: &Value) -> NodeId {
    NodeId(node["id"].as_i64().unwrap())
}

pub fn parse(value: Value) -> Node {
    parse_value(value).unwrap()
}

pub fn compile(value: Value) -> Result<DecoratedTree> {
    Compiler::default().compile(parse_value(value)?)
}

pub fn compile_pedantic(value: Value) -> Result<DecoratedTree> {
    let config = CompilerConfig { pedantic: true, ..CompilerConfig::default() };
    Compiler::new(config).compile(parse_value(value)?)
}

// ============================================================================
// SAMPLE CONTRACTS
// ============================================================================

/// One secret state written in the constructor and again in `assign`
pub fn assign_contract(ast: &Ast) -> Value {
    let a = ast.state("a", ast.uint(), true);
    let init = ast.param("init", true);
    let constructor_body = vec![ast.set("a", "=", "init")];
    let constructor = ast.constructor(vec![init], constructor_body);
    let v = ast.param("v", true);
    let assign_body = vec![ast.set("a", "=", "v")];
    let assign = ast.function("assign", vec![v], assign_body);
    ast.contract("Assign", vec![a, constructor, assign])
}

/// A secret counter only ever incremented
pub fn counter_contract(ast: &Ast) -> Value {
    let x = ast.state("x", ast.uint(), true);
    let k = ast.param("k", true);
    let lhs = ast.ident("x");
    let self_operand = ast.ident("x");
    let operand = ast.ident("k");
    let sum = ast.binary("+", self_operand, operand);
    let body = vec![ast.stmt(ast.assign("=", lhs, sum))];
    let add = ast.function("add", vec![k], body);
    ast.contract("Counter", vec![x, add])
}
