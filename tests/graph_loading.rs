//! End-to-end graph materialization over the in-memory backend

use once_cell::sync::Lazy;
use serde_json::Value;

use sproc_orm::loading::{LoadContext, MAX_RELATION_DEPTH};
use sproc_orm::model::{from_value, to_value, DescriptorBuilder};
use sproc_orm::{
    impl_entity, register_entity, register_loader, Factory, LoadPath, LoadPlan, MemoryDatabase,
    OrmError, OrmResult, ParameterSet, RelatedValue, RelationLoader, RelationMetadata, Row,
};

#[derive(Debug, Clone, Default, PartialEq)]
struct Customer {
    id: i64,
    name: String,
    orders: Vec<Order>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Order {
    id: i64,
    customer_id: i64,
    customer: Option<Customer>,
}

impl_entity!(Customer, "Customer");
impl_entity!(Order, "Order");

struct CustomerLoader {
    factory: Factory<Customer>,
}

impl RelationLoader for CustomerLoader {
    fn set_load_plan(&mut self, plan: Option<LoadPlan>) {
        self.factory.set_load_plan(plan);
    }

    fn invoke(&mut self, method: &str, args: &[Value]) -> OrmResult<RelatedValue> {
        match method {
            "get_by_id" => {
                let params = ParameterSet::new()
                    .input("Id", args.first().cloned().unwrap_or(Value::Null))?;
                let customer = self.factory.map("GetCustomerById", Some(&params), None)?;
                Ok(RelatedValue::one(customer))
            }
            other => Err(OrmError::method_not_found("Customer", other)),
        }
    }
}

struct OrderLoader {
    factory: Factory<Order>,
}

impl RelationLoader for OrderLoader {
    fn set_load_plan(&mut self, plan: Option<LoadPlan>) {
        self.factory.set_load_plan(plan);
    }

    fn invoke(&mut self, method: &str, args: &[Value]) -> OrmResult<RelatedValue> {
        match method {
            "for_customer" => {
                let params = ParameterSet::new()
                    .input("CustomerId", args.first().cloned().unwrap_or(Value::Null))?;
                let orders = self
                    .factory
                    .map_all("GetOrdersForCustomer", Some(&params), None)?;
                Ok(RelatedValue::many(orders))
            }
            other => Err(OrmError::method_not_found("Order", other)),
        }
    }
}

static MODEL: Lazy<()> = Lazy::new(|| {
    register_entity(
        DescriptorBuilder::<Customer>::new()
            .column(
                "Id",
                |c| to_value(&c.id),
                |c, v| {
                    c.id = from_value(v)?;
                    Ok(())
                },
            )
            .column(
                "Name",
                |c| to_value(&c.name),
                |c, v| {
                    c.name = from_value(v)?;
                    Ok(())
                },
            )
            .relation(
                "Orders",
                RelationMetadata::new("Order", "for_customer", &["Id"]),
                |c, v| {
                    c.orders = v.into_many()?;
                    Ok(())
                },
            )
            .build(),
    )
    .unwrap();
    register_entity(
        DescriptorBuilder::<Order>::new()
            .column(
                "Id",
                |o| to_value(&o.id),
                |o, v| {
                    o.id = from_value(v)?;
                    Ok(())
                },
            )
            .column(
                "CustomerId",
                |o| to_value(&o.customer_id),
                |o, v| {
                    o.customer_id = from_value(v)?;
                    Ok(())
                },
            )
            .relation(
                "Customer",
                RelationMetadata::new("Customer", "get_by_id", &["CustomerId"]),
                |o, v| {
                    o.customer = v.into_one()?;
                    Ok(())
                },
            )
            .build(),
    )
    .unwrap();
    register_loader("Customer", |context: LoadContext| {
        Box::new(CustomerLoader {
            factory: Factory::scoped(context),
        })
    });
    register_loader("Order", |context: LoadContext| {
        Box::new(OrderLoader {
            factory: Factory::scoped(context),
        })
    });
});

fn install(name: &str) -> MemoryDatabase {
    Lazy::force(&MODEL);
    let db = MemoryDatabase::install(name).unwrap();
    db.script_rows(
        "GetOrders",
        vec![
            Row::new().with("Id", 100).with("CustomerId", 42),
            Row::new().with("Id", 101).with("CustomerId", 42),
        ],
    );
    db.script("GetCustomerById", |params| {
        let id = params
            .first()
            .and_then(|p| p.value.as_i64())
            .unwrap_or_default();
        vec![Row::new().with("Id", id).with("Name", "Acme")]
    });
    db.script("GetOrdersForCustomer", |params| {
        let customer_id = params
            .first()
            .and_then(|p| p.value.as_i64())
            .unwrap_or_default();
        vec![
            Row::new().with("Id", 100).with("CustomerId", customer_id),
            Row::new().with("Id", 101).with("CustomerId", customer_id),
        ]
    });
    db
}

#[test]
fn test_shared_relation_resolved_once_with_independent_copies() {
    let db = install("graph-shared-relation-test");

    let mut factory = Factory::<Order>::new("graph-shared-relation-test").unwrap();
    factory.set_load_plan(Some(
        LoadPlan::new().with(LoadPath::new("Order", "Customer").unwrap()),
    ));

    let mut orders = factory.map_all("GetOrders", None, None).unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(db.call_count("GetCustomerById"), 1);

    let expected = Customer {
        id: 42,
        name: "Acme".to_string(),
        orders: Vec::new(),
    };
    assert_eq!(orders[0].customer.as_ref(), Some(&expected));
    assert_eq!(orders[1].customer.as_ref(), Some(&expected));

    orders[0].customer.as_mut().unwrap().name = "Mutated".to_string();
    assert_eq!(orders[1].customer.as_ref().unwrap().name, "Acme");
}

#[test]
fn test_one_connection_per_call_tree_and_fresh_cache_per_call() {
    let db = install("graph-call-boundary-test");

    let mut factory = Factory::<Order>::new("graph-call-boundary-test").unwrap();
    factory.set_load_plan(Some(
        LoadPlan::new().with(LoadPath::new("Order", "Customer").unwrap()),
    ));

    factory.map_all("GetOrders", None, None).unwrap();
    assert_eq!(db.connections_opened(), 1);

    // The cache does not survive the first call.
    factory.map_all("GetOrders", None, None).unwrap();
    assert_eq!(db.call_count("GetCustomerById"), 2);
    assert_eq!(db.connections_opened(), 2);
}

#[test]
fn test_nested_plan_descends_one_level() {
    let db = install("graph-nested-plan-test");

    let mut factory = Factory::<Order>::new("graph-nested-plan-test").unwrap();
    factory.set_load_plan(Some(
        LoadPlan::new()
            .with(LoadPath::new("Order", "Customer").unwrap())
            .with(
                LoadPath::new("Order", "Customer")
                    .unwrap()
                    .then("Customer", "Orders")
                    .unwrap(),
            ),
    ));

    let orders = factory.map_all("GetOrders", None, None).unwrap();
    let customer = orders[0].customer.as_ref().unwrap();
    assert_eq!(customer.orders.len(), 2);
    assert_eq!(customer.orders[0].id, 100);
    // The nested orders carry no plan of their own.
    assert!(customer.orders[0].customer.is_none());

    assert_eq!(db.call_count("GetCustomerById"), 1);
    assert_eq!(db.call_count("GetOrdersForCustomer"), 1);
    assert_eq!(db.connections_opened(), 1);
}

// A self-referential relation whose key changes on every hop: the argument
// signature never repeats, so nothing is ever served from the cache and
// only the depth bound can stop the descent.
#[derive(Debug, Clone, Default, PartialEq)]
struct ChainNode {
    id: i64,
    next: Option<Box<ChainNode>>,
}

impl_entity!(ChainNode, "ChainNode");

fn chain_plan() -> LoadPlan {
    LoadPlan::new().with(LoadPath::new("ChainNode", "Next").unwrap())
}

struct ChainNodeLoader {
    factory: Factory<ChainNode>,
}

impl RelationLoader for ChainNodeLoader {
    fn set_load_plan(&mut self, _plan: Option<LoadPlan>) {
        // Re-installs its own plan, so every loaded node descends again.
        self.factory.set_load_plan(Some(chain_plan()));
    }

    fn invoke(&mut self, method: &str, args: &[Value]) -> OrmResult<RelatedValue> {
        match method {
            "next" => {
                let params = ParameterSet::new()
                    .input("Id", args.first().cloned().unwrap_or(Value::Null))?;
                let node = self.factory.map("GetNextNode", Some(&params), None)?;
                Ok(RelatedValue::one(node))
            }
            other => Err(OrmError::method_not_found("ChainNode", other)),
        }
    }
}

static CHAIN: Lazy<()> = Lazy::new(|| {
    register_entity(
        DescriptorBuilder::<ChainNode>::new()
            .column(
                "Id",
                |n| to_value(&n.id),
                |n, v| {
                    n.id = from_value(v)?;
                    Ok(())
                },
            )
            .relation(
                "Next",
                RelationMetadata::new("ChainNode", "next", &["Id"]),
                |n, v| {
                    n.next = v.into_one()?.map(Box::new);
                    Ok(())
                },
            )
            .build(),
    )
    .unwrap();
    register_loader("ChainNode", |context: LoadContext| {
        Box::new(ChainNodeLoader {
            factory: Factory::scoped(context),
        })
    });
});

#[test]
fn test_never_repeating_cycle_hits_the_depth_bound() {
    Lazy::force(&CHAIN);
    let db = MemoryDatabase::install("graph-depth-bound-test").unwrap();
    db.script_rows("GetChainStart", vec![Row::new().with("Id", 1)]);
    db.script("GetNextNode", |params| {
        let id = params
            .first()
            .and_then(|p| p.value.as_i64())
            .unwrap_or_default();
        vec![Row::new().with("Id", id + 1)]
    });

    let mut factory = Factory::<ChainNode>::new("graph-depth-bound-test").unwrap();
    factory.set_load_plan(Some(chain_plan()));

    let err = factory.map("GetChainStart", None, None).unwrap_err();
    assert_eq!(err, OrmError::DepthExceeded(MAX_RELATION_DEPTH));
    // One hop per depth level before the bound fires.
    assert_eq!(db.call_count("GetNextNode"), MAX_RELATION_DEPTH);
}

#[test]
fn test_plan_without_matching_root_is_inert() {
    let db = install("graph-inert-plan-test");

    let mut factory = Factory::<Order>::new("graph-inert-plan-test").unwrap();
    factory.set_load_plan(Some(
        LoadPlan::new().with(LoadPath::new("Customer", "Orders").unwrap()),
    ));

    let orders = factory.map_all("GetOrders", None, None).unwrap();
    assert!(orders[0].customer.is_none());
    assert_eq!(db.call_count("GetCustomerById"), 0);
}
