//! End-to-end editing scenarios through the public API

use std::collections::BTreeMap;
use std::sync::Arc;

use dag_engine::{
    add_module, delete_modules, merge_data_nodes, validate_dag, CType, CValue, DagSpec,
    EditorStore, Graph, LayoutDirection, MemoryBackend, MergeOutcome, ModuleSpecBuilder,
    NodeChange, PlacementConfig, RenderAction,
};
use dag_engine::projection::{render_dag, Size};

fn render(dag: &DagSpec) -> Graph {
    render_dag(
        dag,
        &Graph::default(),
        LayoutDirection::TopToBottom,
        &PlacementConfig::default(),
    )
}

#[test]
fn test_add_then_run() {
    let _ = env_logger::builder().is_test(true).try_init();
    tokio_test::block_on(async {
        let backend = Arc::new(MemoryBackend::new().with_dag("pipeline", DagSpec::empty()));
        let mut store = EditorStore::new(backend.clone());
        store.load_dag("pipeline").await.unwrap();

        store
            .add_module(
                ModuleSpecBuilder::new("stringify")
                    .consumes("x", CType::Integer)
                    .produces("y", CType::String)
                    .build(),
            )
            .await
            .unwrap();

        let dag = store.dag().unwrap();
        assert_eq!(dag.modules.len(), 1);
        assert_eq!(dag.data.len(), 2);
        assert_eq!(dag.in_edges.len(), 1);
        assert_eq!(dag.out_edges.len(), 1);
        assert!(validate_dag(dag).is_empty());

        let inputs = store.dag_inputs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].1.name, "x");

        let x = inputs[0].0;
        let result = store
            .run_with_inputs(BTreeMap::from([(x, CValue::integer(42))]))
            .await
            .unwrap();
        assert_eq!(result.data[&x], CValue::integer(42));
        assert_eq!(store.last_action(), RenderAction::GraphRender);
        assert_eq!(backend.stored("pipeline").as_ref(), store.dag());
    });
}

#[test]
fn test_merge_then_delete() {
    let consumer = |param: &str| {
        ModuleSpecBuilder::new(format!("uses-{}", param))
            .consumes(param, CType::Integer)
            .build()
    };
    let first = add_module(&DagSpec::empty(), consumer("a"));
    let second = add_module(&first.dag, consumer("b"));
    let shared = second.inputs[0];

    let MergeOutcome::Merged(edit) =
        merge_data_nodes(&second.dag, &render(&second.dag), first.inputs[0], shared).unwrap()
    else {
        panic!("Expected merge");
    };
    assert_eq!(edit.dag.inputs().len(), 1);

    let deletion = delete_modules(&edit.dag, &[first.module_id], &render(&edit.dag).edges).unwrap();
    let dag = deletion.edit.dag;
    assert!(dag.data.contains_key(&shared));
    assert_eq!(dag.modules.len(), 1);
    assert_eq!(dag.data[&shared].nicknames.len(), 2);
    assert!(validate_dag(&dag).is_empty());
}

#[test]
fn test_drop_merge_through_store() {
    tokio_test::block_on(async {
        let backend = Arc::new(MemoryBackend::new().with_dag("pipeline", DagSpec::empty()));
        let mut store = EditorStore::new(backend.clone());
        store.load_dag("pipeline").await.unwrap();

        let producer = store
            .add_module(ModuleSpecBuilder::new("p").produces("out", CType::Float).build())
            .await
            .unwrap();
        let consumer = store
            .add_module(ModuleSpecBuilder::new("c").consumes("in", CType::Float).build())
            .await
            .unwrap();

        let sizes: Vec<NodeChange> = store
            .graph()
            .nodes
            .iter()
            .map(|n| NodeChange::Dimensions {
                id: n.id,
                dimensions: Size::new(100.0, 40.0),
            })
            .collect();
        assert_eq!(
            store.on_nodes_change(&sizes).await.unwrap(),
            RenderAction::SetLayout
        );

        let dag = store.dag().unwrap().clone();
        let output = dag.module_outputs(&producer)[0];
        let input = dag.module_inputs(&consumer)[0];
        let target_pos = store.graph().find_node(&input).unwrap().position;

        store
            .on_nodes_change(&[NodeChange::Position {
                id: output,
                position: Some(target_pos),
                dragging: false,
            }])
            .await
            .unwrap();

        let dag = store.dag().unwrap();
        assert_eq!(dag.data.len(), 1);
        assert!(dag.inputs().is_empty());
        assert_eq!(dag.outputs().len(), 0);
        assert_eq!(dag.out_edges, vec![(producer, input)]);
        assert_eq!(dag.in_edges, vec![(input, consumer)]);

        // Deleting the producer turns the shared node into a DAG input
        assert!(store.delete_modules(&[producer]).await.unwrap());
        let inputs = store.dag_inputs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].0, input);
        store.flush_saves().await;
        assert_eq!(backend.stored("pipeline").as_ref(), store.dag());
    });
}
